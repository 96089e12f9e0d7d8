// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent types and configuration.

/// Configuration for the orchestration loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum completion rounds per turn before giving up.
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_tool_rounds: 8 }
    }
}

/// Statistics for a single turn (user query -> final response).
#[derive(Debug, Clone, Default)]
pub struct TurnStats {
    /// Number of completion rounds used.
    pub rounds: usize,
    /// Number of tool calls executed.
    pub tool_call_count: usize,
    /// Duration of the turn in milliseconds.
    pub duration_ms: u64,
    /// Individual tool call stats.
    pub tool_calls: Vec<TurnToolCall>,
}

/// Statistics for a single tool call.
#[derive(Debug, Clone)]
pub struct TurnToolCall {
    /// Tool name.
    pub name: String,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}
