// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use clusterview::routes;
use common::{StubUpstream, test_app_config};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn stub() -> StubUpstream {
    StubUpstream::new()
        .with(
            "/connections/c1/nodes",
            json!([{"node": "n1", "status": "online", "cpu": 0.42, "mem": 500, "maxmem": 1000}]),
        )
        .with(
            "/connections/c2/nodes",
            json!([{"node": "n2", "status": "offline"}]),
        )
        .with(
            "/connections/c1/nodes/n1/rrd?timeframe=hour",
            json!([{"time": 2, "cpu": 0.2}, {"time": 1, "cpu": 0.1}]),
        )
        .with(
            "/connections/c1/nodes/n1/rrd?timeframe=week",
            json!([{"time": 5, "cpu": 0.5}]),
        )
}

fn test_app(upstream: StubUpstream) -> axum::Router {
    routes::app(Arc::new(upstream), test_app_config())
}

/// Build TestServer with http_transport (required for WebSocket tests).
fn test_server_with_http(upstream: StubUpstream) -> TestServer {
    TestServer::builder()
        .http_transport()
        .build(test_app(upstream))
}

#[tokio::test]
async fn test_root_endpoint() {
    let server = TestServer::new(test_app(stub()));
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("clusterview: inventory aggregation service");
}

#[tokio::test]
async fn test_version_endpoint() {
    let server = TestServer::new(test_app(stub()));
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("clusterview")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_resolve_node_payload() {
    let server = TestServer::new(test_app(stub()));
    let response = server
        .get("/api/resolve")
        .add_query_param("kind", "node")
        .add_query_param("id", "c1:n1")
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["kind"], "node");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["metrics"]["cpu"]["pct"], 42);
    assert_eq!(json["metrics"]["ram"]["pct"], 50);
    assert_eq!(json["extension"]["node"]["node"], "n1");
}

#[tokio::test]
async fn test_resolve_not_found_is_404() {
    let server = TestServer::new(test_app(stub()));
    let response = server
        .get("/api/resolve")
        .add_query_param("kind", "node")
        .add_query_param("id", "c1:missing")
        .expect_failure()
        .await;
    response.assert_status_not_found();
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_resolve_upstream_failure_is_502() {
    let server = TestServer::new(test_app(stub()));
    let response = server
        .get("/api/resolve")
        .add_query_param("kind", "cluster")
        .add_query_param("id", "c9")
        .expect_failure()
        .await;
    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_resolve_bad_kind_is_400() {
    let server = TestServer::new(test_app(stub()));
    let response = server
        .get("/api/resolve")
        .add_query_param("kind", "datacenter")
        .expect_failure()
        .await;
    response.assert_status_bad_request();
    let json: Value = response.json();
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_series_endpoint_default_and_explicit_timeframe() {
    let server = TestServer::new(test_app(stub()));
    let response = server
        .get("/api/series")
        .add_query_param("kind", "node")
        .add_query_param("id", "c1:n1")
        .await;
    response.assert_status_ok();
    let points: Vec<Value> = response.json();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["t"], 1000);
    assert_eq!(points[1]["cpuPct"], 20);

    let response = server
        .get("/api/series")
        .add_query_param("kind", "node")
        .add_query_param("id", "c1:n1")
        .add_query_param("timeframe", "week")
        .await;
    let points: Vec<Value> = response.json();
    assert_eq!(points.len(), 1);
}

#[tokio::test]
async fn test_series_cluster_is_empty() {
    let server = TestServer::new(test_app(stub()));
    let response = server
        .get("/api/series")
        .add_query_param("kind", "cluster")
        .add_query_param("id", "c1")
        .await;
    response.assert_status_ok();
    response.assert_json(&json!([]));
}

// --- WebSocket message tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text(ws: &mut axum_test::TestWebSocket) -> Value {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<Value>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_selection_receives_payload() {
    let server = test_server_with_http(stub());
    let mut ws = server
        .get_websocket("/ws/selection")
        .await
        .into_websocket()
        .await;
    ws.send_text(json!({"kind": "node", "id": "c1:n1"}).to_string())
        .await;
    let frame = receive_first_json_text(&mut ws).await;
    assert_eq!(frame["selection"], json!({"kind": "node", "id": "c1:n1"}));
    assert_eq!(frame["payload"]["title"], "n1");
}

#[tokio::test]
async fn test_ws_selection_reports_errors() {
    let server = test_server_with_http(stub());
    let mut ws = server
        .get_websocket("/ws/selection")
        .await
        .into_websocket()
        .await;
    ws.send_text(json!({"kind": "guest", "id": "c1:n1:qemu:100"}).to_string())
        .await;
    let frame = receive_first_json_text(&mut ws).await;
    assert!(frame["error"].as_str().is_some());
    assert!(frame.get("payload").is_none());

    ws.send_text("{\"kind\": \"nonsense\"}").await;
    let frame = receive_first_json_text(&mut ws).await;
    assert!(frame["error"].as_str().unwrap().contains("invalid selection"));
}

#[tokio::test]
async fn test_ws_newer_selection_supersedes_slow_one() {
    let upstream = stub().delayed("/connections/c1/nodes", Duration::from_millis(500));
    let server = test_server_with_http(upstream);
    let mut ws = server
        .get_websocket("/ws/selection")
        .await
        .into_websocket()
        .await;
    ws.send_text(json!({"kind": "node", "id": "c1:n1"}).to_string())
        .await;
    ws.send_text(json!({"kind": "node", "id": "c2:n2"}).to_string())
        .await;
    let frame = receive_first_json_text(&mut ws).await;
    assert_eq!(frame["selection"]["id"], "c2:n2");
    assert_eq!(frame["payload"]["status"], "crit");

    // The slow c1 resolution would have finished by now; nothing may follow for it.
    let late = tokio::time::timeout(Duration::from_millis(800), ws.receive_text()).await;
    assert!(late.is_err(), "unexpected frame after supersession: {late:?}");
}
