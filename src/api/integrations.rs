use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AppState, retrieval_error};
use crate::middleware::{ErrorResponse, require_api_key_from_headers, require_org_access};
use crate::models::{Credentials, IntegrationRecord, Source};

// ============================================
// Request / Response Types
// ============================================

#[derive(Deserialize, Validate)]
pub struct ConnectIntegrationRequest {
    pub org_id: Uuid,
    pub source: Source,
    #[validate(length(min = 1, max = 120))]
    pub display_name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub credentials: Credentials,
}

#[derive(Deserialize)]
pub struct ListIntegrationsQuery {
    #[serde(alias = "orgId")]
    pub org_id: Uuid,
}

/// Client-facing view of an integration. Never carries the credential
/// blob, encrypted or otherwise.
#[derive(Serialize)]
pub struct IntegrationItem {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source: Source,
    pub display_name: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<IntegrationRecord> for IntegrationItem {
    fn from(record: IntegrationRecord) -> Self {
        Self {
            id: record.id,
            org_id: record.org_id,
            source: record.source,
            display_name: record.display_name,
            scopes: record.scopes,
            created_at: record.created_at,
            last_synced_at: record.last_synced_at,
        }
    }
}

#[derive(Serialize)]
pub struct ListIntegrationsResponse {
    pub integrations: Vec<IntegrationItem>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub deleted: bool,
}

// ============================================
// Handlers
// ============================================

/// POST /v1/integrations — connect or reconnect a source for an org.
pub async fn connect_integration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConnectIntegrationRequest>,
) -> Result<Json<IntegrationItem>, (StatusCode, Json<ErrorResponse>)> {
    let key = require_api_key_from_headers(state.store.as_ref(), &headers).await?;
    require_org_access(&key, req.org_id)?;

    req.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid request", "VALIDATION_FAILED").with_details(e.to_string())),
        )
    })?;

    let record = state
        .registry
        .connect(
            req.org_id,
            req.source,
            req.display_name,
            req.scopes,
            &req.credentials,
        )
        .await
        .map_err(retrieval_error)?;

    Ok(Json(record.into()))
}

/// GET /v1/integrations/list?org_id=... — list an org's integrations.
pub async fn list_integrations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListIntegrationsQuery>,
) -> Result<Json<ListIntegrationsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let key = require_api_key_from_headers(state.store.as_ref(), &headers).await?;
    require_org_access(&key, query.org_id)?;

    let records = state
        .registry
        .list(query.org_id)
        .await
        .map_err(retrieval_error)?;

    let integrations: Vec<IntegrationItem> = records.into_iter().map(Into::into).collect();
    let total = integrations.len();
    Ok(Json(ListIntegrationsResponse {
        integrations,
        total,
    }))
}

/// DELETE /v1/integrations/{integration_id} — disconnect. The target org
/// is the caller's own; cross-org IDs come back as 404.
pub async fn disconnect_integration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(integration_id): Path<Uuid>,
) -> Result<Json<DisconnectResponse>, (StatusCode, Json<ErrorResponse>)> {
    let key = require_api_key_from_headers(state.store.as_ref(), &headers).await?;

    let deleted = state
        .registry
        .disconnect(key.organization_id, integration_id)
        .await
        .map_err(retrieval_error)?;

    if !deleted {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "Integration not found",
                "INTEGRATION_NOT_FOUND",
            )),
        ));
    }
    Ok(Json(DisconnectResponse { deleted }))
}
