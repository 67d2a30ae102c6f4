use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{AppState, retrieval_error};
use crate::error::RetrievalError;
use crate::middleware::{ErrorResponse, require_api_key_from_headers, require_org_access};
use crate::models::{FetchOptions, NewDataImport, RetrievedData, Source};

// ============================================
// Request / Response Types
// ============================================

#[derive(Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct RetrieveRequest {
    pub org_id: Uuid,
    /// Target one integration by id...
    pub integration_id: Option<Uuid>,
    /// ...or the org's first integration for a source...
    pub integration_source: Option<Source>,
    /// ...or fan out across all of them (also the default when neither
    /// target is given).
    #[serde(default)]
    pub retrieve_from_all: bool,
    #[serde(default)]
    pub data_types: Vec<String>,
    pub date_range: Option<DateRange>,
    pub limit: Option<usize>,
    /// Persist the retrieved records as a data import for later analysis.
    #[serde(default)]
    pub persist: bool,
}

#[derive(Debug, Serialize)]
pub struct RetrieveSummary {
    pub total_records: usize,
    pub sources: usize,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub data: Vec<RetrievedData>,
    pub summary: RetrieveSummary,
}

// ============================================
// Handler
// ============================================

/// POST /v1/data/retrieve — the single entry point the dashboard uses to
/// pull vendor data, targeted or fanned out.
pub async fn retrieve_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, (StatusCode, Json<ErrorResponse>)> {
    let key = require_api_key_from_headers(state.store.as_ref(), &headers).await?;
    require_org_access(&key, req.org_id)?;

    let options = FetchOptions {
        start_date: req.date_range.as_ref().and_then(|r| r.start),
        end_date: req.date_range.as_ref().and_then(|r| r.end),
        limit: req.limit,
        offset: None,
        filters: None,
    };
    let data_type = req.data_types.first().map(String::as_str);

    let data: Vec<RetrievedData> = if let Some(integration_id) = req.integration_id {
        // The record must belong to the caller's org; a foreign id is
        // indistinguishable from a missing one.
        let record = state
            .registry
            .get(integration_id)
            .await
            .map_err(retrieval_error)?;
        if record.org_id != req.org_id {
            return Err(retrieval_error(RetrievalError::IntegrationNotFound(
                integration_id,
            )));
        }
        let retrieved = state
            .retrieval
            .retrieve_from_integration(integration_id, data_type, &options)
            .await
            .map_err(retrieval_error)?;
        vec![retrieved]
    } else if let Some(source) = req.integration_source {
        let record = state
            .registry
            .find_by_source(req.org_id, source)
            .await
            .map_err(retrieval_error)?
            .ok_or_else(|| {
                retrieval_error(RetrievalError::SourceNotConnected {
                    org_id: req.org_id,
                    integration_source: source,
                })
            })?;
        let retrieved = state
            .retrieval
            .retrieve_from_integration(record.id, data_type, &options)
            .await
            .map_err(retrieval_error)?;
        vec![retrieved]
    } else {
        state
            .retrieval
            .retrieve_from_all(req.org_id, &req.data_types, &options)
            .await
            .map_err(retrieval_error)?
    };

    if req.persist {
        persist_imports(&state, req.org_id, &key.id, &data).await;
    }

    let summary = RetrieveSummary {
        total_records: data.iter().map(|d| d.records.len()).sum(),
        sources: data.len(),
    };
    Ok(Json(RetrieveResponse { data, summary }))
}

/// Best effort: a failed import write is logged, never a request failure.
async fn persist_imports(state: &AppState, org_id: Uuid, key_id: &Uuid, data: &[RetrievedData]) {
    for retrieved in data {
        let import = NewDataImport {
            org_id,
            file_type: "json".to_string(),
            data: serde_json::Value::Array(retrieved.records.clone()),
            metadata: json!({
                "source": retrieved.source,
                "data_type": retrieved.data_type,
                "retrieved_at": retrieved.metadata.retrieved_at,
                "total_count": retrieved.metadata.total_count,
                "integration_id": retrieved.metadata.integration_id,
            }),
            created_by: key_id.to_string(),
        };
        if let Err(err) = state.store.insert_data_import(import).await {
            tracing::warn!(
                org_id = %org_id,
                source = %retrieved.source,
                error = %err,
                "failed to persist data import"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterRegistry;
    use crate::crypto::CredentialStore;
    use crate::models::Credentials;
    use crate::registry::IntegrationRegistry;
    use crate::retrieval::{DataRetrievalService, RetrievalSettings};
    use crate::store::{IntegrationStore, MemoryStore};
    use crate::utils::{generate_api_key, hash_api_key};
    use axum::extract::State;
    use std::sync::Arc;

    async fn demo_state() -> (AppState, Arc<MemoryStore>, Uuid, String) {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn IntegrationStore> = memory.clone();
        let registry = IntegrationRegistry::new(
            store.clone(),
            Arc::new(CredentialStore::new("retrieve-handler-test")),
        );
        let retrieval = Arc::new(DataRetrievalService::new(
            registry.clone(),
            Arc::new(AdapterRegistry::with_defaults()),
            RetrievalSettings {
                demo_mode: true,
                ..RetrievalSettings::default()
            },
        ));

        let org = Uuid::new_v4();
        let (api_key, prefix) = generate_api_key();
        store
            .insert_api_key(crate::models::NewApiKey {
                organization_id: org,
                name: "test".into(),
                key_prefix: prefix,
                key_hash: hash_api_key(&api_key),
                scopes: vec![],
                created_by: "admin".into(),
            })
            .await
            .unwrap();

        registry
            .connect(
                org,
                Source::Acuity,
                "Acuity".into(),
                vec![],
                &Credentials::ApiKey {
                    user_id: "u".into(),
                    api_key: "k".into(),
                },
            )
            .await
            .unwrap();

        let state = AppState {
            store,
            registry,
            retrieval,
            admin_token: "admin-token".into(),
        };
        (state, memory, org, api_key)
    }

    fn auth_headers(api_key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", api_key.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn persist_writes_one_import_per_result() {
        let (state, memory, org, api_key) = demo_state().await;

        let Json(response) = retrieve_data(
            State(state),
            auth_headers(&api_key),
            Json(RetrieveRequest {
                org_id: org,
                integration_id: None,
                integration_source: None,
                retrieve_from_all: true,
                data_types: vec![],
                date_range: None,
                limit: Some(3),
                persist: true,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.summary.sources, response.data.len());
        assert!(response.summary.total_records > 0);
        assert_eq!(memory.import_count().await, response.data.len());
    }

    #[tokio::test]
    async fn cross_org_request_is_forbidden() {
        let (state, _, _, api_key) = demo_state().await;

        let (status, body) = retrieve_data(
            State(state),
            auth_headers(&api_key),
            Json(RetrieveRequest {
                org_id: Uuid::new_v4(),
                integration_id: None,
                integration_source: None,
                retrieve_from_all: true,
                data_types: vec![],
                date_range: None,
                limit: None,
                persist: false,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, "ORG_FORBIDDEN");
    }

    #[tokio::test]
    async fn unconnected_source_is_404() {
        let (state, _, org, api_key) = demo_state().await;

        let (status, body) = retrieve_data(
            State(state),
            auth_headers(&api_key),
            Json(RetrieveRequest {
                org_id: org,
                integration_id: None,
                integration_source: Some(Source::Quickbooks),
                retrieve_from_all: false,
                data_types: vec![],
                date_range: None,
                limit: None,
                persist: false,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "SOURCE_NOT_CONNECTED");
    }
}
