// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Completion service integration.
//!
//! The orchestration loop talks to the model through the [`Provider`] trait:
//! one `respond` call per round, carrying input items, the tool catalog, and
//! the previous response id for server-side conversation state.
//!
//! ```bash
//! export OPENAI_API_KEY=your-key
//! ```

pub mod openai;

pub use openai::OpenAIProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

/// An item sent to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    /// A conversation message.
    Message { role: String, content: String },

    /// The output of an executed tool call, keyed by call id.
    FunctionCallOutput { call_id: String, output: String },
}

impl InputItem {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// A tool output item answering `call_id`.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// One text block inside a message output item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// An item produced by the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Assistant text output.
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },

    /// A tool invocation request. `arguments` is a JSON-encoded string.
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },

    /// Anything this client does not act on (reasoning items etc.).
    #[serde(other)]
    Unknown,
}

impl OutputItem {
    /// Collect the text of a message item.
    pub fn message_text(&self) -> Option<String> {
        match self {
            Self::Message { content } => Some(
                content
                    .iter()
                    .filter(|part| part.kind == "output_text")
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join(""),
            ),
            _ => None,
        }
    }
}

/// A complete response from the completion service.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderResponse {
    /// Response id, passed back as `previous_response_id` next round.
    pub id: String,

    /// Output items in model order.
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

/// Interface to a completion service.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one completion round.
    async fn respond(
        &self,
        input: &[InputItem],
        tools: &[Value],
        previous_response_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;
}

/// Boxed provider for dynamic dispatch.
pub type BoxedProvider = Box<dyn Provider>;
