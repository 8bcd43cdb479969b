use axum::{Json, extract::State};
use std::sync::Arc;

use crate::AppState;
use crate::error::ApiError;
use crate::store::Metric;

/// Hourly metric buckets updated in the last 24 hours, oldest first
#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "metrics",
    responses(
        (status = 200, body = Vec<Metric>),
    )
)]
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Metric>>, ApiError> {
    Ok(Json(state.pool.recent_metrics().await?))
}
