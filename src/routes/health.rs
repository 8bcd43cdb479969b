use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::{AppState, BUILD_TIME, GIT_HASH, VERSION};

/// Liveness plus a storage round-trip; 503 when the database is unreachable
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.pool.size().await {
        Ok(pool_size) => Json(json!({ "status": "ok", "pool_size": pool_size })).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": e.to_string() })),
        )
            .into_response(),
    }
}

pub async fn version() -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": VERSION,
        "git_hash": GIT_HASH,
        "build_time": BUILD_TIME,
    }))
}
