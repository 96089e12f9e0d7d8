// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Orchestration loop tying the completion service to MCP tools.
//!
//! One turn: send the user query, execute any tool calls the model asks
//! for, feed their outputs back, and repeat until a round produces no tool
//! calls. Conversation state lives server-side; each round passes the
//! previous response id instead of replaying history.

pub mod types;

pub use types::{AgentConfig, TurnStats, TurnToolCall};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};
use crate::mcp::{McpError, ToolDispatcher};
use crate::providers::{BoxedProvider, InputItem, OutputItem};

/// Drives turns against a provider and a tool dispatcher.
pub struct Agent {
    provider: BoxedProvider,
    dispatcher: Arc<dyn ToolDispatcher>,
    config: AgentConfig,

    /// Response id of the last completed round, for conversation state.
    previous_response_id: Option<String>,

    /// Stats for the most recent turn.
    last_turn_stats: TurnStats,
}

impl Agent {
    /// Create a new agent.
    pub fn new(
        provider: BoxedProvider,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            config,
            previous_response_id: None,
            last_turn_stats: TurnStats::default(),
        }
    }

    /// Stats for the most recent turn.
    pub fn last_turn_stats(&self) -> &TurnStats {
        &self.last_turn_stats
    }

    /// Forget the threaded conversation; the next turn starts fresh.
    pub fn clear(&mut self) {
        self.previous_response_id = None;
    }

    /// Run one turn: user query in, final text out.
    pub async fn run_turn(&mut self, query: &str) -> Result<String> {
        self.run_turn_internal(query, None).await
    }

    /// Run one turn with a cancellation signal.
    ///
    /// If `cancel_rx` flips to true, the turn short-circuits with
    /// `AgentError::UserCancelled`.
    pub async fn run_turn_with_cancel(
        &mut self,
        query: &str,
        cancel_rx: watch::Receiver<bool>,
    ) -> Result<String> {
        self.run_turn_internal(query, Some(cancel_rx)).await
    }

    async fn run_turn_internal(
        &mut self,
        query: &str,
        mut cancel_rx: Option<watch::Receiver<bool>>,
    ) -> Result<String> {
        let start_time = Instant::now();
        let mut stats = TurnStats::default();

        let tools: Vec<serde_json::Value> = self
            .dispatcher
            .catalog()
            .await
            .iter()
            .map(|t| t.to_function_tool())
            .collect();

        let mut input = vec![InputItem::user(query)];
        let mut final_text: Vec<String> = Vec::new();

        loop {
            if let Some(rx) = cancel_rx.as_ref() {
                if *rx.borrow() {
                    return Err(AgentError::UserCancelled.into());
                }
            }

            if stats.rounds >= self.config.max_tool_rounds {
                return Err(AgentError::ToolRoundLimitExceeded {
                    limit: self.config.max_tool_rounds,
                }
                .into());
            }
            stats.rounds += 1;

            let response = with_cancel(
                self.provider
                    .respond(&input, &tools, self.previous_response_id.as_deref()),
                cancel_rx.as_mut(),
            )
            .await?
            .map_err(AgentError::Provider)?;

            self.previous_response_id = Some(response.id.clone());
            input.clear();

            for item in &response.output {
                match item {
                    OutputItem::Message { .. } => {
                        if let Some(text) = item.message_text() {
                            if !text.is_empty() {
                                final_text.push(text);
                            }
                        }
                    }
                    OutputItem::FunctionCall {
                        call_id,
                        name,
                        arguments,
                    } => {
                        // Dropping the dispatch future on cancel abandons the
                        // in-flight call rather than waiting it out.
                        let output = with_cancel(
                            self.execute_call(name, arguments, &mut stats),
                            cancel_rx.as_mut(),
                        )
                        .await?;
                        match output {
                            Some(output) => {
                                input.push(InputItem::function_call_output(call_id, output));
                            }
                            // No owner for this tool; drop the call.
                            None => {
                                warn!(tool = %name, "No connected server owns tool, skipping");
                            }
                        }
                    }
                    OutputItem::Unknown => {}
                }
            }

            // Nothing to feed back means the model is done.
            if input.is_empty() {
                break;
            }
        }

        stats.duration_ms = start_time.elapsed().as_millis() as u64;
        self.last_turn_stats = stats;

        Ok(final_text.join("\n"))
    }

    /// Execute one function call. Returns `None` when no server owns the
    /// tool; errors are folded into the output text so the model sees them.
    async fn execute_call(
        &self,
        name: &str,
        arguments: &str,
        stats: &mut TurnStats,
    ) -> Option<String> {
        let started = Instant::now();

        let args: serde_json::Value = match serde_json::from_str(arguments) {
            Ok(args) => args,
            Err(e) => {
                stats.tool_call_count += 1;
                stats.tool_calls.push(TurnToolCall {
                    name: name.to_string(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    is_error: true,
                });
                return Some(format!("tool execution error: bad arguments: {e}"));
            }
        };

        debug!(tool = %name, "Dispatching tool call");
        let result = self.dispatcher.dispatch(name, args).await;

        let (output, is_error) = match result {
            Ok(text) => (text, false),
            Err(McpError::ToolNotFound { .. }) => return None,
            Err(e) => (format!("tool execution error: {e}"), true),
        };

        stats.tool_call_count += 1;
        stats.tool_calls.push(TurnToolCall {
            name: name.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            is_error,
        });
        Some(output)
    }
}

/// Await a future, short-circuiting with `UserCancelled` if the cancel
/// signal flips to true first. The future is dropped on cancellation.
async fn with_cancel<T>(
    fut: impl Future<Output = T>,
    cancel_rx: Option<&mut watch::Receiver<bool>>,
) -> std::result::Result<T, AgentError> {
    let Some(rx) = cancel_rx else {
        return Ok(fut.await);
    };
    if *rx.borrow() {
        return Err(AgentError::UserCancelled);
    }

    tokio::pin!(fut);
    loop {
        tokio::select! {
            out = &mut fut => break Ok(out),
            changed = rx.changed() => {
                if *rx.borrow() {
                    break Err(AgentError::UserCancelled);
                }
                // Sender gone; no cancellation can arrive any more.
                if changed.is_err() {
                    break Ok((&mut fut).await);
                }
            }
        }
    }
}
