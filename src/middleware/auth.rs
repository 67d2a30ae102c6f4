use axum::{
    Json,
    http::{StatusCode, header},
};
use serde::Serialize;

use crate::store::IntegrationStore;
use crate::utils::hash_api_key;

#[derive(Debug, Clone)]
pub struct ApiKeyInfo {
    pub id: uuid::Uuid,
    pub organization_id: uuid::Uuid,
    pub scopes: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Authenticate a request by API key (`X-API-Key` or `Authorization:
/// Bearer`). Fail-closed: when the key lookup itself fails we return 503
/// rather than guessing — never 200, never a silent bypass.
pub async fn require_api_key_from_headers(
    store: &dyn IntegrationStore,
    headers: &axum::http::HeaderMap,
) -> Result<ApiKeyInfo, (StatusCode, Json<ErrorResponse>)> {
    let token = headers
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        });

    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "API key required. Use X-API-Key header or Authorization: Bearer <key>",
                    "API_KEY_REQUIRED",
                )),
            ));
        }
    };

    let key_hash = hash_api_key(token);
    match store.find_api_key_by_hash(&key_hash).await {
        Ok(Some(record)) => Ok(ApiKeyInfo {
            id: record.id,
            organization_id: record.organization_id,
            scopes: record.scopes,
        }),
        Ok(None) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid API key", "API_KEY_INVALID")),
        )),
        Err(err) => {
            tracing::error!(error = %err, "API key lookup failed; refusing request");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "Permission check unavailable. Try again shortly.",
                    "PERMISSION_CHECK_UNAVAILABLE",
                )),
            ))
        }
    }
}

/// Every org-scoped endpoint must pass the caller's key through this
/// check before touching the requested org's data.
pub fn require_org_access(
    key: &ApiKeyInfo,
    org_id: uuid::Uuid,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if key.organization_id == org_id {
        return Ok(());
    }
    tracing::warn!(
        key_id = %key.id,
        key_org = %key.organization_id,
        requested_org = %org_id,
        "cross-organization access denied"
    );
    Err((
        StatusCode::FORBIDDEN,
        Json(ErrorResponse::new(
            "API key does not grant access to this organization",
            "ORG_FORBIDDEN",
        )),
    ))
}

/// Admin-token gate for key-management endpoints.
pub fn require_admin_token(
    headers: &axum::http::HeaderMap,
    admin_token: &str,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    match token {
        Some(t) if t == admin_token => Ok(()),
        Some(_) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid admin token", "ADMIN_TOKEN_INVALID")),
        )),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "Admin token required. Use Authorization: Bearer <token>",
                "ADMIN_TOKEN_REQUIRED",
            )),
        )),
    }
}
