// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP (Model Context Protocol) over the legacy SSE transport.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   GET /sse (bootstrap)   ┌────────────┐
//! │  SseClient │ ───────────────────────► │ MCP server │
//! │            │ ◄─── event: endpoint ─── │            │
//! │            │                          │            │
//! │            │   POST <endpoint url>    │            │
//! │            │ ───── JSON-RPC 2.0 ────► │            │
//! └────────────┘                          └────────────┘
//! ```
//!
//! The stream exists only to deliver the request endpoint (and heartbeats);
//! every JSON-RPC exchange runs over plain HTTP POST. [`ClientSet`] layers
//! several clients behind one merged catalog for the orchestration loop.

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{ClientSet, SseClient, ToolDispatcher};
pub use error::McpError;
pub use types::{ConnectionState, McpContent, McpToolInfo, McpToolResult, ServerInfo};
