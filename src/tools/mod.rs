// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool system for mcpsh.
//!
//! This module provides the infrastructure for defining and executing the
//! tools the server exposes over MCP:
//!
//! - [`ToolHandler`] trait - core abstraction for tool implementations
//! - [`ToolRegistry`] - maps tool names to handlers, dispatches calls
//! - Individual handlers in the [`handlers`] module

pub mod handlers;
pub mod registry;

pub use handlers::{PlatformHandler, ShellHandler};
pub use registry::{DispatchResult, ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder};

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::ToolError;

/// Default timeout for command execution in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// JSON Schema for tool input parameters.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Always "object"
    pub properties: HashMap<String, Value>,
    pub required: Vec<String>,
}

impl InputSchema {
    /// Create a new input schema with object type.
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property to the schema.
    pub fn with_property(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark properties as required.
    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = required;
        self
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of a tool as advertised by `tools/list`.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::new(),
        }
    }

    /// Set the input schema for this tool.
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Parse JSON arguments into a typed struct.
pub fn parse_arguments<T>(arguments: &Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments.clone())
        .map_err(|err| ToolError::InvalidInput(format!("Failed to parse arguments: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_serializes_camel_case_schema() {
        let def = ToolDefinition::new("get_platform", "Detect the host platform");
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains("inputSchema"));
        assert!(json.contains("\"type\":\"object\""));
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Deserialize)]
        struct Args {
            platform: String,
        }

        let args: Args = parse_arguments(&serde_json::json!({"platform": "*nix"})).unwrap();
        assert_eq!(args.platform, "*nix");

        let err = parse_arguments::<Args>(&serde_json::json!({"other": 1}));
        assert!(matches!(err, Err(ToolError::InvalidInput(_))));
    }
}
