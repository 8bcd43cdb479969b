use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use super::ErrorResponse;
use crate::AppState;
use crate::constants::BEARER_PREFIX;
use crate::error::ApiError;
use crate::store::null_as_default;

// --- Types ---

#[derive(Deserialize, Serialize, ToSchema)]
pub struct AuthRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub passkey: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    /// Bearer token for protected routes (the passkey itself)
    pub token: String,
}

// --- Gate ---

/// Compare a supplied passkey with the configured one. On success the passkey doubles
/// as the bearer token.
pub fn check_passkey(supplied: &str, configured: Option<&str>) -> Result<String, ApiError> {
    if supplied.is_empty() {
        return Err(ApiError::BadRequest("passkey required".into()));
    }

    let configured = configured
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::Configuration)?;

    // Constant-time comparison to prevent timing attacks
    if supplied.as_bytes().ct_eq(configured.as_bytes()).into() {
        Ok(supplied.to_string())
    } else {
        Err(ApiError::Unauthorized("invalid passkey".into()))
    }
}

/// Require an `Authorization: Bearer ...` header.
///
/// Only the prefix is checked; the token itself is not compared with the passkey.
pub fn require_bearer(headers: &HeaderMap) -> Result<(), ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with(BEARER_PREFIX))
        .map(|_| ())
        .ok_or_else(|| ApiError::Unauthorized("unauthorized".into()))
}

// --- Handlers ---

/// Exchange the shared passkey for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth",
    tag = "auth",
    request_body = AuthRequest,
    responses(
        (status = 200, body = TokenResponse),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request: AuthRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("invalid request".into()))?;

    let token = check_passkey(&request.passkey, state.passkey.as_deref())?;
    Ok(Json(TokenResponse { token }))
}
