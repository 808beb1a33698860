// HTTP + WebSocket routes for the http output mode

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use crate::config::OutputConfig;
use crate::models::Snapshot;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) snapshot_rx: watch::Receiver<Snapshot>,
    pub(crate) ws_connections: Arc<AtomicUsize>,
    pub(crate) output: OutputConfig,
}

pub fn app(
    snapshot_rx: watch::Receiver<Snapshot>,
    ws_connections: Arc<AtomicUsize>,
    output: OutputConfig,
) -> Router {
    let state = AppState {
        snapshot_rx,
        ws_connections,
        output,
    };
    Router::new()
        .route("/", get(http::table_handler)) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/snapshot", get(http::snapshot_handler)) // GET /api/snapshot
        .route("/api/interfaces/{name}", get(http::interface_handler)) // GET /api/interfaces/{name}
        .route("/ws/stats", get(ws::ws_stats)) // WS /ws/stats
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
