// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON-RPC method dispatch for the MCP server.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::mcp::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND,
};
use crate::tools::ToolRegistry;

/// Name this server reports in `initialize` and `/health`.
pub const SERVER_NAME: &str = "shell_helper";

/// Handle one JSON-RPC request against the tool registry.
///
/// Always produces a response whose id echoes the request id; requests
/// without an id echo null.
pub async fn handle_request(registry: &ToolRegistry, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone().unwrap_or(Value::Null);
    let params = request.params.unwrap_or_else(|| json!({}));

    debug!(method = %request.method, "Handling JSON-RPC request");

    match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": crate::VERSION
                }
            }),
        ),

        "tools/list" => {
            let tools = registry.definitions();
            match serde_json::to_value(&tools) {
                Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
                Err(err) => JsonRpcResponse::error(
                    id,
                    INTERNAL_ERROR,
                    format!("Internal error: {err}"),
                ),
            }
        }

        "tools/call" => {
            let tool_name = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));

            match registry.dispatch(tool_name, arguments).await {
                // Handler failures surface as JSON-RPC errors, not content.
                Ok(result) if result.is_error => {
                    warn!(tool = %tool_name, error = %result.output.content, "Tool call failed");
                    JsonRpcResponse::error(id, INTERNAL_ERROR, result.output.content)
                }
                Ok(result) => JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [
                            {
                                "type": "text",
                                "text": result.output.content
                            }
                        ]
                    }),
                ),
                Err(ToolError::NotFound(name)) => {
                    warn!(tool = %name, "Unknown tool requested");
                    JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Tool not found: {name}"))
                }
                Err(err) => {
                    JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {err}"))
                }
            }
        }

        method => {
            warn!(method = %method, "Unknown JSON-RPC method");
            JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::JsonRpcRequest;

    fn request(id: u64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, params)
    }

    #[tokio::test]
    async fn test_initialize() {
        let registry = ToolRegistry::with_defaults();
        let response = handle_request(&registry, request(1, "initialize", json!({}))).await;

        assert_eq!(response.id, Value::from(1));
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let registry = ToolRegistry::with_defaults();
        let response = handle_request(&registry, request(2, "tools/list", json!({}))).await;

        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"get_platform"));
        assert!(names.contains(&"shell_helper"));
        // Schemas go out in wire form.
        assert!(tools[0].get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn test_tools_call_get_platform() {
        let registry = ToolRegistry::with_defaults();
        let response = handle_request(
            &registry,
            request(3, "tools/call", json!({"name": "get_platform", "arguments": {}})),
        )
        .await;

        assert_eq!(response.id, Value::from(3));
        let result = response.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(matches!(text, "Windows" | "*nix" | "Unknown"));
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool() {
        let registry = ToolRegistry::with_defaults();
        let response = handle_request(
            &registry,
            request(4, "tools/call", json!({"name": "frobnicate", "arguments": {}})),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert!(error.message.contains("frobnicate"));
    }

    #[tokio::test]
    async fn test_tools_call_handler_failure_is_internal_error() {
        let registry = ToolRegistry::with_defaults();
        // shell_helper with no arguments fails input parsing in the handler.
        let response = handle_request(
            &registry,
            request(9, "tools/call", json!({"name": "shell_helper", "arguments": {}})),
        )
        .await;

        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert!(error.message.contains("platform"));
        assert_eq!(response.id, Value::from(9));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let registry = ToolRegistry::with_defaults();
        let response = handle_request(&registry, request(5, "resources/list", json!({}))).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(response.id, Value::from(5));
    }

    #[tokio::test]
    async fn test_missing_id_echoes_null() {
        let registry = ToolRegistry::with_defaults();
        let req = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: "tools/list".to_string(),
            params: None,
            id: None,
        };
        let response = handle_request(&registry, req).await;
        assert_eq!(response.id, Value::Null);
    }
}
