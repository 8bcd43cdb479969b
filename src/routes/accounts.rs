use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Uri},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ErrorResponse, MessageResponse, require_bearer};
use crate::AppState;
use crate::error::ApiError;
use crate::store::{Account, NewAccount, null_as_default};

// --- Types ---

#[derive(Deserialize, Serialize, ToSchema)]
pub struct AddAccountsRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub accounts: Vec<NewAccount>,
}

// --- Helpers ---

/// First `count` value of the query string; later repeats are ignored
pub(super) fn first_count(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;
    params
        .into_iter()
        .find_map(|(key, value)| (key == "count").then_some(value))
}

/// Parse the `count` query parameter, defaulting to `0`
pub(super) fn parse_count(raw: Option<&str>) -> Result<i64, ApiError> {
    match raw.unwrap_or("0").parse::<i64>() {
        Ok(count) if count >= 0 => Ok(count),
        _ => Err(ApiError::BadRequest("invalid count parameter".into())),
    }
}

// --- Handlers ---

/// List the pool, or consume `count` accounts from it
#[utoipa::path(
    get,
    path = "/api/accounts",
    tag = "accounts",
    params(("count" = Option<String>, Query, description = "Accounts to consume; 0 lists without consuming")),
    responses(
        (status = 200, body = Vec<Account>),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse),
    )
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<Vec<Account>>, ApiError> {
    require_bearer(&headers)?;
    let count = parse_count(first_count(&uri).as_deref())?;
    let accounts = state.pool.list_or_consume(count).await?;
    Ok(Json(accounts))
}

/// Add accounts to the pool; duplicates are skipped silently
#[utoipa::path(
    post,
    path = "/api/accounts",
    tag = "accounts",
    request_body = AddAccountsRequest,
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, body = ErrorResponse),
    )
)]
pub async fn add_accounts(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: AddAccountsRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.pool.add_many(request.accounts).await?;
    Ok(Json(MessageResponse {
        message: "accounts added".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(None).unwrap(), 0);
        assert_eq!(parse_count(Some("0")).unwrap(), 0);
        assert_eq!(parse_count(Some("12")).unwrap(), 12);
        assert_eq!(parse_count(Some("+3")).unwrap(), 3);

        for bad in ["-1", "", "abc", "1.5", " 2", "99999999999999999999"] {
            assert!(
                matches!(parse_count(Some(bad)), Err(ApiError::BadRequest(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_first_count() {
        let uri: Uri = "/api/accounts?count=1&count=2".parse().unwrap();
        assert_eq!(first_count(&uri).as_deref(), Some("1"));

        let uri: Uri = "/api/accounts?other=3".parse().unwrap();
        assert_eq!(first_count(&uri), None);

        let uri: Uri = "/api/accounts".parse().unwrap();
        assert_eq!(first_count(&uri), None);
    }

    #[test]
    fn test_add_request_defaults() {
        let request: AddAccountsRequest = serde_json::from_str("{}").unwrap();
        assert!(request.accounts.is_empty());

        let request: AddAccountsRequest = serde_json::from_str(r#"{"accounts": null}"#).unwrap();
        assert!(request.accounts.is_empty());
    }
}
