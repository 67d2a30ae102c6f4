use thiserror::Error;
use uuid::Uuid;

use crate::crypto::{DecryptionError, EncryptionError};
use crate::models::Source;
use crate::store::StoreError;

/// Failures surfaced by the integration registry and the retrieval
/// orchestrator. Inside a multi-integration fan-out these are caught,
/// logged, and skipped; single-integration lookups propagate them.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    // Field is `integration_source`, not `source`: thiserror reserves a
    // field named `source` for the error cause chain.
    #[error(
        "data type '{data_type}' is not supported by source '{integration_source}' (supported: {supported})"
    )]
    UnsupportedDataType {
        integration_source: Source,
        data_type: String,
        supported: String,
    },

    #[error("integration for source '{integration_source}' is missing required credentials: {detail}")]
    MissingCredentials {
        integration_source: Source,
        detail: String,
    },

    #[error("integration {0} not found")]
    IntegrationNotFound(Uuid),

    #[error("organization {org_id} has no '{integration_source}' integration")]
    SourceNotConnected {
        org_id: Uuid,
        integration_source: Source,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("request to '{integration_source}' failed: {detail}")]
    Upstream {
        integration_source: Source,
        detail: String,
    },

    #[error("request to '{integration_source}' timed out after {timeout_secs}s")]
    Timeout {
        integration_source: Source,
        timeout_secs: u64,
    },
}
