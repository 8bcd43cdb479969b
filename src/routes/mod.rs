mod accounts;
mod auth;
pub mod health;
mod metrics;

// Glob re-exports so utoipa's `routes!()` macro can find the hidden `__path_*` structs
// alongside the handler functions at the `crate::routes::*` path.
pub use accounts::*;
pub use auth::*;
pub use metrics::*;

use axum::{
    Router,
    body::Body,
    handler::HandlerWithoutStateExt,
    http::Request,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use utoipa::ToSchema;

use crate::AppState;

// --- Shared response types ---

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Static file serving ---

/// The bundle's `index.html`, answered with 200 whatever the incoming method
#[derive(Clone)]
pub struct IndexFile(PathBuf);

impl IndexFile {
    pub fn new(frontend_dir: &Path) -> Self {
        Self(frontend_dir.join("index.html"))
    }

    pub async fn serve(self) -> Response {
        // ServeFile only answers GET/HEAD, so read it through a fresh GET
        match ServeFile::new(&self.0).oneshot(Request::new(Body::empty())).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        }
    }
}

/// Serve the prebuilt frontend bundle; unknown paths and methods get its `index.html`
pub fn static_routes(frontend_dir: &Path) -> Router<Arc<AppState>> {
    let index = IndexFile::new(frontend_dir);
    let fallback = (move || index.clone().serve()).into_service();
    Router::new().fallback_service(
        ServeDir::new(frontend_dir)
            .call_fallback_on_method_not_allowed(true)
            .fallback(fallback),
    )
}
