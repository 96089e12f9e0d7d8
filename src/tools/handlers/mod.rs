// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Built-in tool handlers.

pub mod platform;
pub mod shell;

pub use platform::PlatformHandler;
pub use shell::ShellHandler;
