use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::middleware::{ErrorResponse, require_admin_token};
use crate::models::NewApiKey;
use crate::utils::{generate_api_key, hash_api_key};

// ============================================
// Request / Response Types
// ============================================

#[derive(Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    pub org_id: Uuid,
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Returned exactly once, at creation. Only the hash survives.
#[derive(Serialize)]
pub struct CreatedApiKeyResponse {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub key: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
}

#[derive(Serialize)]
pub struct ApiKeyItem {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct ApiKeyOrgQuery {
    #[serde(alias = "orgId")]
    pub org_id: Uuid,
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub revoked: bool,
}

// ============================================
// Handlers (admin token required)
// ============================================

/// POST /v1/api-keys — mint a key for an organization.
pub async fn create_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<Json<CreatedApiKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    require_admin_token(&headers, &state.admin_token)?;

    req.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid request", "VALIDATION_FAILED").with_details(e.to_string())),
        )
    })?;

    let (key, key_prefix) = generate_api_key();
    let record = state
        .store
        .insert_api_key(NewApiKey {
            organization_id: req.org_id,
            name: req.name,
            key_prefix: key_prefix.clone(),
            key_hash: hash_api_key(&key),
            scopes: req.scopes,
            created_by: "admin".to_string(),
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to create API key");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to create API key", "DB_ERROR")),
            )
        })?;

    tracing::info!(key_id = %record.id, org_id = %record.organization_id, "API key created");

    Ok(Json(CreatedApiKeyResponse {
        id: record.id,
        org_id: record.organization_id,
        name: record.name,
        key,
        key_prefix,
        scopes: record.scopes,
    }))
}

/// GET /v1/api-keys?org_id=... — list an org's keys (hashes withheld).
pub async fn list_api_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ApiKeyOrgQuery>,
) -> Result<Json<Vec<ApiKeyItem>>, (StatusCode, Json<ErrorResponse>)> {
    require_admin_token(&headers, &state.admin_token)?;

    let records = state.store.list_api_keys(query.org_id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to list API keys");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to list API keys", "DB_ERROR")),
        )
    })?;

    Ok(Json(
        records
            .into_iter()
            .map(|r| ApiKeyItem {
                id: r.id,
                org_id: r.organization_id,
                name: r.name,
                key_prefix: r.key_prefix,
                scopes: r.scopes,
                created_at: r.created_at,
                revoked_at: r.revoked_at,
            })
            .collect(),
    ))
}

/// DELETE /v1/api-keys/{key_id}?org_id=... — revoke. Revoked keys fail
/// authentication immediately; the row is kept for audit.
pub async fn revoke_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
    Query(query): Query<ApiKeyOrgQuery>,
) -> Result<Json<RevokeResponse>, (StatusCode, Json<ErrorResponse>)> {
    require_admin_token(&headers, &state.admin_token)?;

    let revoked = state
        .store
        .revoke_api_key(query.org_id, key_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to revoke API key");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to revoke API key", "DB_ERROR")),
            )
        })?;

    if !revoked {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("API key not found", "API_KEY_NOT_FOUND")),
        ));
    }

    tracing::info!(key_id = %key_id, org_id = %query.org_id, "API key revoked");
    Ok(Json(RevokeResponse { revoked }))
}
