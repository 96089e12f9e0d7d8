// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP types for tool metadata and call results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Information about an MCP tool, as carried by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolInfo {
    /// Tool name.
    pub name: String,

    /// Tool description.
    #[serde(default)]
    pub description: Option<String>,

    /// JSON Schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,

    /// Server this tool belongs to. Filled in client-side, not on the wire.
    #[serde(skip)]
    pub server: String,
}

impl McpToolInfo {
    /// Convert to the flat function-tool form the completion API expects.
    pub fn to_function_tool(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "name": self.name,
            "description": self.description.as_deref().unwrap_or(""),
            "parameters": self.input_schema,
        })
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Result content blocks.
    pub content: Vec<McpContent>,

    /// Whether the call failed server-side.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl McpToolResult {
    /// Create a successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Get the text content as a single string.
    pub fn as_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                McpContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content blocks that can appear in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    /// Plain text content.
    Text { text: String },
}

/// Server information reported during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            version: "0.0.0".to_string(),
        }
    }
}

/// Connection state for an SSE-backed MCP client.
///
/// The only path to `Ready` runs through the bootstrap and handshake
/// states in order. `Failed` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,

    /// Opening the event stream.
    StreamOpening,

    /// Stream open, waiting for the endpoint bootstrap event.
    AwaitingBootstrap,

    /// Endpoint known, running initialize / tools/list.
    Handshaking,

    /// Fully initialized and ready for tool calls.
    Ready,

    /// Connection or handshake failed.
    Failed,

    /// Connection shut down.
    Closed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::StreamOpening => write!(f, "stream-opening"),
            Self::AwaitingBootstrap => write!(f, "awaiting-bootstrap"),
            Self::Handshaking => write!(f, "handshaking"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
