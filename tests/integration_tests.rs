// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use bwmon::config::AppConfig;
use bwmon::models::{InterfaceSnapshot, Snapshot};
use bwmon::routes;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::watch;

const TEST_CONFIG: &str = r#"
[output]
mode = "http"
dynamic_units = false

[server]
port = 8081
host = "127.0.0.1"
"#;

fn test_app() -> (axum::Router, watch::Sender<Snapshot>) {
    let config = AppConfig::load_from_str(TEST_CONFIG).unwrap();
    let (tx, rx) = watch::channel(common::two_tick_snapshot());
    let app = routes::app(rx, Arc::new(AtomicUsize::new(0)), config.output);
    (app, tx)
}

/// Build TestServer with http_transport (required for WebSocket tests).
fn test_server_with_http() -> (TestServer, watch::Sender<Snapshot>) {
    let (app, tx) = test_app();
    let server = TestServer::builder().http_transport().build(app);
    (server, tx)
}

#[tokio::test]
async fn test_root_endpoint_renders_table() {
    let (app, _) = test_app();
    let server = TestServer::new(app);
    let response = server.get("/").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("source: scripted"));
    assert!(text.contains("eth0:"));
    assert!(text.contains("wlan0:"));
    assert!(text.contains("total:"));
    assert!(text.contains("1000.00 B/s"));
}

#[tokio::test]
async fn test_version_endpoint() {
    let (app, _) = test_app();
    let server = TestServer::new(app);
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("bwmon"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_snapshot_endpoint() {
    let (app, _) = test_app();
    let server = TestServer::new(app);
    let response = server.get("/api/snapshot").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["tick"], 2);
    assert_eq!(json["source"], "scripted");
    assert_eq!(json["interfaces"][0]["name"], "eth0");
    assert_eq!(json["interfaces"][0]["stats"]["rxBytes"]["rate"], 1000.0);
    assert_eq!(json["total"]["stats"]["rxBytes"]["sum"], 1250);
}

#[tokio::test]
async fn test_interface_endpoint() {
    let (app, _) = test_app();
    let server = TestServer::new(app);

    let response = server.get("/api/interfaces/wlan0").await;
    response.assert_status_ok();
    let iface: InterfaceSnapshot = response.json();
    assert_eq!(iface.stats.rx_bytes.rate, Some(250.0));

    let response = server.get("/api/interfaces/total").await;
    response.assert_status_ok();
    let total: InterfaceSnapshot = response.json();
    assert_eq!(total.stats.tx_bytes.rate, Some(500.0));
}

#[tokio::test]
async fn test_unknown_interface_is_404() {
    let (app, _) = test_app();
    let server = TestServer::new(app);
    let response = server.get("/api/interfaces/nope0").expect_failure().await;
    response.assert_status_not_found();
}

// Receive until we get valid JSON (server may send Ping first).
async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_stats_sends_current_then_published_snapshots() {
    let (server, tx) = test_server_with_http();
    let mut ws = server.get_websocket("/ws/stats").await.into_websocket().await;

    let first: Snapshot = receive_first_json_text(&mut ws).await;
    assert_eq!(first.tick, 2);

    let mut next = first.clone();
    next.tick = 3;
    next.warning = Some("acquisition exceeded 1s".into());
    tx.send_replace(next);

    let received: Snapshot = receive_first_json_text(&mut ws).await;
    assert_eq!(received.tick, 3);
    assert_eq!(received.warning.as_deref(), Some("acquisition exceeded 1s"));
}
