use std::sync::Arc;

use axum::{Json, http::StatusCode};

use crate::error::RetrievalError;
use crate::middleware::ErrorResponse;
use crate::registry::IntegrationRegistry;
use crate::retrieval::DataRetrievalService;
use crate::store::IntegrationStore;

pub mod api_keys;
pub mod health;
pub mod integrations;
pub mod retrieve;
pub mod routes;

// ============================================
// Application State
// ============================================

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IntegrationStore>,
    pub registry: IntegrationRegistry,
    pub retrieval: Arc<DataRetrievalService>,
    pub admin_token: String,
}

/// Map a retrieval-layer error onto the HTTP surface. Internal detail goes
/// to the log, not the response body.
pub fn retrieval_error(err: RetrievalError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        RetrievalError::UnsupportedDataType { .. } => {
            (StatusCode::BAD_REQUEST, "UNSUPPORTED_DATA_TYPE")
        }
        RetrievalError::MissingCredentials { .. } => {
            (StatusCode::BAD_REQUEST, "MISSING_CREDENTIALS")
        }
        RetrievalError::IntegrationNotFound(_) => {
            (StatusCode::NOT_FOUND, "INTEGRATION_NOT_FOUND")
        }
        RetrievalError::SourceNotConnected { .. } => {
            (StatusCode::NOT_FOUND, "SOURCE_NOT_CONNECTED")
        }
        RetrievalError::Decryption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "CREDENTIAL_DECRYPT_FAILED")
        }
        RetrievalError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENCRYPTION_FAILED"),
        RetrievalError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR"),
        RetrievalError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILED"),
        RetrievalError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
    };

    if status.is_server_error() {
        tracing::error!(error = %err, code, "retrieval request failed");
    }

    let message = match &err {
        // Server-side failures get a generic body.
        RetrievalError::Decryption(_) => "Stored credentials could not be decrypted".to_string(),
        RetrievalError::Encryption(_) => "Credential encryption failed".to_string(),
        RetrievalError::Store(_) => "Database error".to_string(),
        other => other.to_string(),
    };

    (status, Json(ErrorResponse::new(message, code)))
}
