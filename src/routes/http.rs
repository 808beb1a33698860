// GET handlers: plain table, version, snapshot, single interface

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::AppState;
use crate::output::plain;
use crate::version::{NAME, VERSION};

/// GET /: the latest snapshot as the plain-text table.
pub(super) async fn table_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    plain::render(&snapshot, &state.output)
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/snapshot: the latest published snapshot.
pub(super) async fn snapshot_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.snapshot_rx.borrow().clone())
}

/// GET /api/interfaces/{name}: one interface (or `total`); 404 if not visible.
pub(super) async fn interface_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    let found = if name == snapshot.total.name {
        Some(snapshot.total)
    } else {
        snapshot.interfaces.into_iter().find(|i| i.name == name)
    };
    match found {
        Some(iface) => axum::Json(iface).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({ "error": format!("unknown interface: {name}") })),
        )
            .into_response(),
    }
}
