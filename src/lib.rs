// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! mcpsh - cross-platform shell tools for LLM tool calling over MCP.
//!
//! One binary, two roles:
//!
//! - **serve**: an MCP server over the legacy SSE transport exposing
//!   `get_platform` and `shell_helper`
//! - **chat**: a client that connects to configured SSE servers, merges
//!   their tool catalogs, and drives an LLM tool-calling loop against them
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`error`] - Error types and result aliases
//! - [`config`] - Client-side server list configuration
//! - [`mcp`] - SSE-transport protocol, client, and multi-server aggregation
//! - [`server`] - The MCP server (axum routes, sessions, JSON-RPC dispatch)
//! - [`tools`] - Tool handlers and registry
//! - [`providers`] - Completion service integration
//! - [`agent`] - The orchestration loop

pub mod agent;
pub mod config;
pub mod error;
pub mod mcp;
pub mod providers;
pub mod server;
pub mod tools;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
