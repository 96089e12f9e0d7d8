// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end tests for the SSE transport: a real server on an ephemeral
//! port, exercised by the real client and by raw HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};

use mcpsh::mcp::protocol::{sse_data_payload, sse_event_name, SseLineBuffer};
use mcpsh::mcp::{ClientSet, ConnectionState, SseClient};
use mcpsh::server::{router, AppState, SERVER_NAME};
use mcpsh::tools::ToolRegistry;

/// Start a full server on an ephemeral port.
async fn spawn_server() -> (SocketAddr, AppState) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(Arc::new(ToolRegistry::with_defaults()), addr.to_string());
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn connected_client(addr: SocketAddr) -> SseClient {
    let mut client = SseClient::new("test", format!("http://{addr}/sse"));
    client.connect().await.unwrap();
    client
}

async fn post_rpc(addr: SocketAddr, body: &str) -> (reqwest::StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/sse/messages"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = response.status();
    let body: Value = response.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn handshake_reaches_ready() {
    let (addr, _state) = spawn_server().await;
    let client = connected_client(addr).await;

    assert_eq!(client.state(), ConnectionState::Ready);
    assert!(client.is_ready());

    let info = client.server_info().unwrap();
    assert_eq!(info.name, SERVER_NAME);

    let mut names: Vec<&str> = client.tools().iter().map(|t| t.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["get_platform", "shell_helper"]);
    // Tools are tagged with the owning client's name.
    assert!(client.tools().iter().all(|t| t.server == "test"));
}

#[tokio::test]
async fn initialize_reports_protocol_and_echoes_id() {
    let (addr, _state) = spawn_server().await;
    let (status, body) = post_rpc(
        addr,
        r#"{"jsonrpc":"2.0","id":42,"method":"initialize","params":{}}"#,
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["id"], 42);
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(body["result"]["serverInfo"]["name"], SERVER_NAME);
}

#[tokio::test]
async fn tools_list_is_idempotent() {
    let (addr, _state) = spawn_server().await;
    let (_, first) = post_rpc(addr, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await;
    let (_, second) = post_rpc(addr, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;

    assert_eq!(first["result"], second["result"]);
    let tools = first["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));
}

#[cfg(unix)]
#[tokio::test]
async fn get_platform_over_the_wire() {
    let (addr, _state) = spawn_server().await;
    let mut client = connected_client(addr).await;

    let result = client.call_tool("get_platform", json!({})).await.unwrap();
    assert_eq!(result.as_text(), "*nix");
}

#[cfg(unix)]
#[tokio::test]
async fn shell_helper_over_the_wire() {
    let (addr, _state) = spawn_server().await;
    let mut client = connected_client(addr).await;

    let result = client
        .call_tool(
            "shell_helper",
            json!({"platform": "*nix", "shell_command": "echo integration"}),
        )
        .await
        .unwrap();

    let text = result.as_text();
    assert!(text.contains("integration"));
    assert!(text.contains("return code: 0"));
}

#[tokio::test]
async fn malformed_json_yields_400_parse_error() {
    let (addr, _state) = spawn_server().await;
    let (status, body) = post_rpc(addr, "{this is not json").await;

    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn failing_tool_call_yields_internal_error() {
    let (addr, _state) = spawn_server().await;
    // shell_helper without its required arguments fails inside the handler.
    let (status, body) = post_rpc(
        addr,
        r#"{"jsonrpc":"2.0","id":11,"method":"tools/call","params":{"name":"shell_helper","arguments":{}}}"#,
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert!(body.get("result").is_none());
    assert_eq!(body["error"]["code"], -32603);
    assert!(body["error"]["message"].as_str().unwrap().contains("platform"));
    assert_eq!(body["id"], 11);
}

#[tokio::test]
async fn unknown_method_yields_method_not_found() {
    let (addr, _state) = spawn_server().await;
    let (status, body) = post_rpc(
        addr,
        r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#,
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn unknown_tool_yields_method_not_found() {
    let (addr, _state) = spawn_server().await;
    let (_, body) = post_rpc(
        addr,
        r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"frobnicate","arguments":{}}}"#,
    )
    .await;

    assert_eq!(body["error"]["code"], -32601);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("frobnicate"));
}

#[tokio::test]
async fn health_reports_server_identity() {
    let (addr, _state) = spawn_server().await;
    let health: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health["status"], "healthy");
    assert_eq!(health["server"], SERVER_NAME);
    assert_eq!(health["active_clients"], 0);
}

#[tokio::test]
async fn stream_opens_with_endpoint_event() {
    let (addr, state) = spawn_server().await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/sse"))
        .header("accept", "text/event-stream")
        .send()
        .await
        .unwrap();

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    // Read frames until the bootstrap event's data line shows up.
    let mut stream = response.bytes_stream();
    let mut buffer = SseLineBuffer::default();
    let mut event_name = String::new();
    let mut endpoint_url = None;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while endpoint_url.is_none() {
        let chunk = tokio::time::timeout_at(deadline, stream.next())
            .await
            .expect("timed out waiting for bootstrap")
            .expect("stream ended without bootstrap")
            .unwrap();
        for line in buffer.push(&chunk) {
            if let Some(name) = sse_event_name(&line) {
                event_name = name.to_string();
            } else if let Some(payload) = sse_data_payload(&line) {
                if event_name == "endpoint" {
                    let data: Value = serde_json::from_str(payload).unwrap();
                    endpoint_url = Some(data["url"].as_str().unwrap().to_string());
                }
            }
        }
    }

    let endpoint_url = endpoint_url.unwrap();
    assert_eq!(endpoint_url, format!("http://{addr}/sse/messages"));
    assert_eq!(state.sessions().active_count(), 1);
}

#[tokio::test]
async fn open_stream_survives_malformed_post() {
    let (addr, state) = spawn_server().await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/sse"))
        .send()
        .await
        .unwrap();
    let mut stream = response.bytes_stream();

    // Wait for the bootstrap frame so the session is registered.
    let mut buffer = SseLineBuffer::default();
    let mut bootstrapped = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !bootstrapped {
        let chunk = tokio::time::timeout_at(deadline, stream.next())
            .await
            .expect("timed out waiting for bootstrap")
            .expect("stream ended without bootstrap")
            .unwrap();
        for line in buffer.push(&chunk) {
            if sse_event_name(&line) == Some("endpoint") {
                bootstrapped = true;
            }
        }
    }
    assert_eq!(state.sessions().active_count(), 1);

    let (status, _) = post_rpc(addr, "{this is not json").await;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);

    // The rejected POST must not tear the session down; the stream keeps
    // delivering frames.
    assert_eq!(state.sessions().active_count(), 1);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(8);
    tokio::time::timeout_at(deadline, stream.next())
        .await
        .expect("stream went silent after malformed POST")
        .expect("stream closed after malformed POST")
        .unwrap();
}

#[tokio::test]
async fn idle_stream_sends_ping_heartbeat() {
    let (addr, _state) = spawn_server().await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/sse"))
        .send()
        .await
        .unwrap();

    let mut stream = response.bytes_stream();
    let mut buffer = SseLineBuffer::default();
    let mut saw_ping = false;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(8);
    while !saw_ping {
        let chunk = tokio::time::timeout_at(deadline, stream.next())
            .await
            .expect("no ping before deadline")
            .expect("stream ended")
            .unwrap();
        for line in buffer.push(&chunk) {
            if sse_event_name(&line) == Some("ping") {
                saw_ping = true;
            }
        }
    }
}

#[tokio::test]
async fn bootstrapless_stream_fails_the_client() {
    use axum::response::sse::{Event, Sse};
    use axum::routing::get;
    use axum::Router;
    use std::convert::Infallible;

    // A server whose stream ends without ever sending the endpoint event.
    let app = Router::new().route(
        "/sse",
        get(|| async {
            let frames: Vec<Result<Event, Infallible>> =
                vec![Ok(Event::default().event("ping").data(""))];
            Sse::new(futures_util::stream::iter(frames))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut client = SseClient::new("broken", format!("http://{addr}/sse"));
    let result = client.connect().await;

    assert!(result.is_err());
    assert_eq!(client.state(), ConnectionState::Failed);
    assert!(client.last_error().is_some());
}

#[tokio::test]
async fn client_set_merges_and_routes() {
    let (addr_a, _state_a) = spawn_server().await;
    let (addr_b, _state_b) = spawn_server().await;

    let mut set = ClientSet::new();
    set.add_client(SseClient::new("alpha", format!("http://{addr_a}/sse")));
    set.add_client(SseClient::new("beta", format!("http://{addr_b}/sse")));

    for (_, result) in set.connect_all().await {
        result.unwrap();
    }

    // Both servers expose the same two tools; the merged catalog keeps the
    // first registration of each.
    let tools = set.list_all_tools().await;
    assert_eq!(tools.len(), 2);
    assert!(tools.iter().all(|t| t.server == "alpha"));

    assert_eq!(set.find_tool("get_platform").await.unwrap(), "alpha");

    #[cfg(unix)]
    {
        let result = set.call_tool("get_platform", json!({})).await.unwrap();
        assert_eq!(result.as_text(), "*nix");
    }

    set.disconnect_all().await;
}

#[cfg(unix)]
#[tokio::test]
async fn disconnect_abandons_inflight_call() {
    let (addr, _state) = spawn_server().await;

    let mut set = ClientSet::new();
    set.add_client(SseClient::new("slow", format!("http://{addr}/sse")));
    for (_, result) in set.connect_all().await {
        result.unwrap();
    }
    let set = Arc::new(set);

    // Park a tool call that will not return on its own.
    let caller = Arc::clone(&set);
    let call = tokio::spawn(async move {
        caller
            .call_tool(
                "shell_helper",
                json!({"platform": "*nix", "shell_command": "sleep 60"}),
            )
            .await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Shutdown must not wait the sleep out.
    tokio::time::timeout(Duration::from_secs(5), set.disconnect_all())
        .await
        .expect("disconnect_all blocked on the in-flight call");

    let result = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("abandoned call never resolved")
        .unwrap();
    assert!(result.is_err());
}
