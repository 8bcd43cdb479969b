use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("insufficient accounts")]
    InsufficientAccounts { available: i64, requested: i64 },

    #[error("{0}")]
    Unauthorized(String),

    #[error("server configuration error")]
    Configuration,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InsufficientAccounts { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Configuration | ApiError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::InsufficientAccounts {
                available,
                requested,
            } => json!({
                "error": self.to_string(),
                "available": available,
                "requested": requested,
            }),
            ApiError::DatabaseError(_) => {
                tracing::error!("{self}");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_insufficient_accounts_body() {
        let (status, body) = body_json(ApiError::InsufficientAccounts {
            available: 1,
            requested: 5,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "insufficient accounts");
        assert_eq!(body["available"], 1);
        assert_eq!(body["requested"], 5);
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let (status, body) = body_json(ApiError::Configuration).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "server configuration error");

        let (status, body) = body_json(ApiError::Unauthorized("unauthorized".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
        assert!(body.get("available").is_none());
    }
}
