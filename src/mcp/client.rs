// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SSE-transport MCP client and multi-server aggregation.
//!
//! An [`SseClient`] connects to one server: it opens the event stream, waits
//! for the `endpoint` bootstrap event, then runs the initialize and
//! tools/list handshake over the request channel. After the bootstrap event
//! the stream is dropped; all JSON-RPC traffic goes over POST.
//!
//! A [`ClientSet`] aggregates several clients behind one merged tool catalog.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::mcp::error::McpError;
use crate::mcp::protocol::{
    is_event_stream_content_type, sse_data_payload, sse_event_name, EndpointEvent, JsonRpcRequest,
    JsonRpcResponse, SseLineBuffer, MCP_PROTOCOL_VERSION,
};
use crate::mcp::types::{ConnectionState, McpToolInfo, McpToolResult, ServerInfo};

/// How long to wait for the endpoint bootstrap event.
const BOOTSTRAP_TIMEOUT_SECS: u64 = 10;

/// Per-request timeout on the JSON-RPC channel.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one MCP server over the legacy SSE transport.
pub struct SseClient {
    /// Server name (from config).
    name: String,

    /// URL of the `/sse` event-stream route.
    stream_url: String,

    /// Shared HTTP client. No global timeout; the event stream is
    /// long-lived, so timeouts are applied per request.
    http: reqwest::Client,

    /// Connection state.
    state: ConnectionState,

    /// Request endpoint learned from the bootstrap event.
    endpoint_url: Option<String>,

    /// Server info (after initialization).
    server_info: Option<ServerInfo>,

    /// Available tools (after initialization).
    tools: Vec<McpToolInfo>,

    /// Last error message.
    last_error: Option<String>,

    /// Request ID counter.
    request_id: u64,
}

impl SseClient {
    /// Create a new client for the given `/sse` URL. Does not connect.
    pub fn new(name: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream_url: stream_url.into(),
            http: reqwest::Client::new(),
            state: ConnectionState::Disconnected,
            endpoint_url: None,
            server_info: None,
            tools: Vec::new(),
            last_error: None,
            request_id: 0,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get server info (if available).
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Get available tools.
    pub fn tools(&self) -> &[McpToolInfo] {
        &self.tools
    }

    /// Get the last error message.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Check if the client is ready for tool calls.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Get the next request ID. Strictly increasing, starting at 1.
    fn next_request_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    /// Connect: open the stream, bootstrap, then handshake.
    pub async fn connect(&mut self) -> Result<(), McpError> {
        if self.state == ConnectionState::Ready {
            return Ok(());
        }
        // Closed is terminal.
        if self.state == ConnectionState::Closed {
            return Err(McpError::connection_failed(&self.name, "client is closed"));
        }

        let result = self.connect_inner().await;
        match result {
            Ok(()) => {
                self.state = ConnectionState::Ready;
                self.last_error = None;
                info!(
                    server = %self.name,
                    tools = self.tools.len(),
                    "MCP client ready"
                );
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn connect_inner(&mut self) -> Result<(), McpError> {
        self.state = ConnectionState::StreamOpening;
        let response = self
            .http
            .get(&self.stream_url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| McpError::connection_failed(&self.name, e.to_string()))?;

        if !response.status().is_success() {
            return Err(McpError::connection_failed(
                &self.name,
                format!("stream request returned {}", response.status()),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !is_event_stream_content_type(content_type) {
            return Err(McpError::connection_failed(
                &self.name,
                format!("expected text/event-stream, got '{content_type}'"),
            ));
        }

        self.state = ConnectionState::AwaitingBootstrap;
        let endpoint_url = tokio::time::timeout(
            Duration::from_secs(BOOTSTRAP_TIMEOUT_SECS),
            read_bootstrap(response, &self.name),
        )
        .await
        .map_err(|_| McpError::ConnectionTimeout {
            server: self.name.clone(),
            timeout_secs: BOOTSTRAP_TIMEOUT_SECS,
        })??;

        debug!(server = %self.name, endpoint = %endpoint_url, "Bootstrap complete");
        self.endpoint_url = Some(endpoint_url);

        self.state = ConnectionState::Handshaking;
        self.send_initialize().await?;
        self.fetch_tools().await?;
        Ok(())
    }

    /// Run the `initialize` handshake.
    async fn send_initialize(&mut self) -> Result<(), McpError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "mcpsh",
                        "version": crate::VERSION
                    }
                }),
            )
            .await
            .map_err(|e| McpError::init_failed(&self.name, e.to_string()))?;

        let server_info = result
            .get("serverInfo")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        self.server_info = Some(server_info);
        Ok(())
    }

    /// Fetch the tool list and tag each tool with this server's name.
    async fn fetch_tools(&mut self) -> Result<(), McpError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| McpError::InvalidResponse("tools/list result has no tools".into()))?;

        let mut tools: Vec<McpToolInfo> = serde_json::from_value(tools)?;
        for tool in &mut tools {
            tool.server = self.name.clone();
        }
        self.tools = tools;
        Ok(())
    }

    /// Call a tool on this server.
    pub async fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<McpToolResult, McpError> {
        if !self.is_ready() {
            return Err(McpError::NotReady(self.name.clone()));
        }

        let result = self
            .request(
                "tools/call",
                json!({
                    "name": tool_name,
                    "arguments": arguments
                }),
            )
            .await?;

        let result: McpToolResult = serde_json::from_value(result)?;
        if result.is_error {
            return Err(McpError::tool_failed(tool_name, result.as_text()));
        }
        Ok(result)
    }

    /// Send one JSON-RPC request over the endpoint and return its result.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        let endpoint = self
            .endpoint_url
            .clone()
            .ok_or_else(|| McpError::NotReady(self.name.clone()))?;
        let request_id = self.next_request_id();
        let request = JsonRpcRequest::new(request_id, method, params);

        let response = self
            .http
            .post(&endpoint)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: JsonRpcResponse = response.json().await.map_err(|e| {
            McpError::InvalidResponse(format!("bad JSON-RPC body (HTTP {status}): {e}"))
        })?;

        if let Some(error) = body.error {
            return Err(McpError::protocol(error.code, error.message));
        }

        // Responses must correlate to the request they answer.
        if body.id != Value::from(request_id) {
            return Err(McpError::InvalidResponse(format!(
                "response id {} does not match request id {request_id}",
                body.id
            )));
        }

        body.result
            .ok_or_else(|| McpError::InvalidResponse("response has neither result nor error".into()))
    }

    /// Shut the client down. Terminal; a closed client cannot reconnect.
    pub fn close(&mut self) {
        debug!(server = %self.name, "Closing MCP client");
        self.endpoint_url = None;
        self.tools.clear();
        self.state = ConnectionState::Closed;
    }
}

/// Read the event stream until the `endpoint` bootstrap event arrives.
///
/// The response (and with it the connection) is dropped on return.
async fn read_bootstrap(response: reqwest::Response, server: &str) -> Result<String, McpError> {
    let mut stream = response.bytes_stream();
    let mut buffer = SseLineBuffer::default();
    let mut current_event: Option<String> = None;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| McpError::transport(e.to_string()))?;
        for line in buffer.push(&chunk) {
            if let Some(name) = sse_event_name(&line) {
                current_event = Some(name.to_string());
                continue;
            }
            if let Some(payload) = sse_data_payload(&line) {
                if current_event.as_deref() == Some("endpoint") {
                    let endpoint: EndpointEvent = serde_json::from_str(payload).map_err(|e| {
                        McpError::InvalidResponse(format!("bad endpoint event: {e}"))
                    })?;
                    return Ok(endpoint.url);
                }
            }
        }
    }

    Err(McpError::MissingBootstrap {
        server: server.to_string(),
    })
}

/// Merge per-server catalogs into one, first-registered-wins on collisions.
fn merge_catalogs(catalogs: Vec<(String, Vec<McpToolInfo>)>) -> Vec<McpToolInfo> {
    let mut merged: Vec<McpToolInfo> = Vec::new();
    for (server, tools) in catalogs {
        for tool in tools {
            if let Some(existing) = merged.iter().find(|t| t.name == tool.name) {
                warn!(
                    tool = %tool.name,
                    kept = %existing.server,
                    skipped = %server,
                    "Duplicate tool name, keeping first registration"
                );
                continue;
            }
            merged.push(tool);
        }
    }
    merged
}

/// Routes tool calls by name against one or more connected servers.
///
/// The orchestration loop depends on this seam rather than on concrete
/// clients, so tests can substitute a canned dispatcher.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// The merged tool catalog.
    async fn catalog(&self) -> Vec<McpToolInfo>;

    /// Execute a tool by name, returning its text output.
    async fn dispatch(&self, tool_name: &str, arguments: Value) -> Result<String, McpError>;
}

/// A set of SSE clients with a merged tool catalog.
///
/// Registration order matters: catalog collisions keep the
/// first-registered tool, and shutdown runs in reverse order.
pub struct ClientSet {
    clients: Vec<(String, Arc<RwLock<SseClient>>)>,

    /// Flipped once by `disconnect_all`; in-flight calls watch it and bail.
    shutdown_tx: watch::Sender<bool>,
}

impl Default for ClientSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSet {
    /// Create an empty set.
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            clients: Vec::new(),
            shutdown_tx,
        }
    }

    /// Add a client. Does not connect.
    pub fn add_client(&mut self, client: SseClient) {
        let name = client.name().to_string();
        self.clients.push((name, Arc::new(RwLock::new(client))));
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Get a client by server name.
    pub fn get(&self, name: &str) -> Option<Arc<RwLock<SseClient>>> {
        self.clients
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| Arc::clone(c))
    }

    /// Connect every client, returning per-server outcomes.
    pub async fn connect_all(&self) -> Vec<(String, Result<(), McpError>)> {
        let mut results = Vec::new();
        for (name, client) in &self.clients {
            let result = client.write().await.connect().await;
            if let Err(ref e) = result {
                warn!(server = %name, error = %e, "MCP connection failed");
            }
            results.push((name.clone(), result));
        }
        results
    }

    /// The merged catalog across all ready clients.
    pub async fn list_all_tools(&self) -> Vec<McpToolInfo> {
        let mut catalogs = Vec::new();
        for (name, client) in &self.clients {
            let client = client.read().await;
            if client.is_ready() {
                catalogs.push((name.clone(), client.tools().to_vec()));
            }
        }
        merge_catalogs(catalogs)
    }

    /// Find the first ready client that owns a tool.
    pub async fn find_tool(&self, tool_name: &str) -> Option<String> {
        for (name, client) in &self.clients {
            let client = client.read().await;
            if client.is_ready() && client.tools().iter().any(|t| t.name == tool_name) {
                return Some(name.clone());
            }
        }
        None
    }

    /// Call a tool on the first client that owns it.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<McpToolResult, McpError> {
        let server = self
            .find_tool(tool_name)
            .await
            .ok_or_else(|| McpError::ToolNotFound {
                server: "*".to_string(),
                tool: tool_name.to_string(),
            })?;

        let client = self
            .get(&server)
            .ok_or_else(|| McpError::ServerNotFound(server.clone()))?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return Err(McpError::transport("client set is shutting down"));
        }

        let call = async {
            let mut client = client.write().await;
            client.call_tool(tool_name, arguments).await
        };
        // Abandon the call (and release the client lock) on shutdown.
        tokio::select! {
            result = call => result,
            _ = shutdown_rx.changed() => {
                Err(McpError::transport("client set is shutting down"))
            }
        }
    }

    /// Shut every client down, last-registered first.
    ///
    /// In-flight tool calls are abandoned, not waited for.
    pub async fn disconnect_all(&self) {
        // send_replace updates the value even with no live receivers.
        self.shutdown_tx.send_replace(true);
        for (_, client) in self.clients.iter().rev() {
            client.write().await.close();
        }
    }
}

#[async_trait]
impl ToolDispatcher for ClientSet {
    async fn catalog(&self) -> Vec<McpToolInfo> {
        self.list_all_tools().await
    }

    async fn dispatch(&self, tool_name: &str, arguments: Value) -> Result<String, McpError> {
        let result = self.call_tool(tool_name, arguments).await?;
        Ok(result.as_text())
    }
}
