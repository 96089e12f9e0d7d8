// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP server over the legacy SSE transport.
//!
//! Three routes:
//!
//! ```text
//! GET  /sse           long-lived event stream; first frame is the
//!                     `endpoint` bootstrap event, then queued `message`
//!                     frames and idle `ping` heartbeats
//! POST /sse/messages  JSON-RPC 2.0 request channel
//! GET  /health        liveness probe with active session count
//! ```

pub mod rpc;
pub mod session;

pub use rpc::{handle_request, SERVER_NAME};
pub use session::SessionTable;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use futures_util::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

use crate::error::Result;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, PARSE_ERROR};
use crate::tools::ToolRegistry;

/// Heartbeat interval while a session's queue is idle.
const PING_INTERVAL: Duration = Duration::from_secs(5);

/// Shared state behind the router.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ToolRegistry>,
    sessions: SessionTable,
    /// Advertised in the bootstrap event when the request has no Host header.
    fallback_host: String,
}

impl AppState {
    pub fn new(registry: Arc<ToolRegistry>, fallback_host: impl Into<String>) -> Self {
        Self {
            registry,
            sessions: SessionTable::new(),
            fallback_host: fallback_host.into(),
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }
}

/// Build the router for the MCP server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .route("/sse/messages", post(message_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "MCP SSE server listening");

    let state = AppState::new(
        Arc::new(ToolRegistry::with_defaults()),
        local_addr.to_string(),
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn sse_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(&state.fallback_host)
        .to_string();
    let endpoint_url = format!("http://{host}/sse/messages");

    let (guard, mut rx) = state.sessions.register();
    info!(session = %guard.id(), "SSE stream opened");

    let stream = async_stream::stream! {
        // Guard lives as long as the stream; dropping it on any exit path
        // removes the session from the table.
        let _guard = guard;

        yield Ok(Event::default()
            .event("endpoint")
            .data(json!({"url": endpoint_url}).to_string()));

        loop {
            match timeout(PING_INTERVAL, rx.recv()).await {
                Ok(Some(message)) => {
                    yield Ok(Event::default().event("message").data(message.to_string()));
                }
                Ok(None) => break,
                Err(_) => {
                    yield Ok(Event::default().event("ping").data(""));
                }
            }
        }
    };

    // The stream yields its own pings; axum's keep-alive is not needed.
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(3600)))
}

async fn message_handler(
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    "Parse error: invalid JSON",
                )),
            );
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JsonRpcResponse::error(
                    Value::Null,
                    INTERNAL_ERROR,
                    format!("Internal error: {err}"),
                )),
            );
        }
    };

    let response = handle_request(&state.registry, request).await;
    (StatusCode::OK, Json(response))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server": SERVER_NAME,
        "version": crate::VERSION,
        "active_clients": state.sessions.active_count(),
    }))
}
