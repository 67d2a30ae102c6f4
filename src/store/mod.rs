// ============================================
// Persistence layer
// ============================================
//
// `IntegrationStore` is the seam between the registry/orchestrator and
// storage. `PgStore` backs production; `MemoryStore` backs development
// without a database and the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ApiKeyRecord, IntegrationRecord, NewApiKey, NewDataImport, NewIntegration};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid stored value: {0}")]
    Invalid(String),
}

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    /// Create an integration, or update the existing (org, source) record
    /// in place for sources that allow only one integration per org.
    async fn upsert_integration(
        &self,
        new: NewIntegration,
    ) -> Result<IntegrationRecord, StoreError>;

    async fn find_integration(&self, id: Uuid) -> Result<Option<IntegrationRecord>, StoreError>;

    async fn list_integrations(&self, org_id: Uuid) -> Result<Vec<IntegrationRecord>, StoreError>;

    async fn update_last_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns whether a row was deleted.
    async fn delete_integration(&self, org_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_api_key(&self, new: NewApiKey) -> Result<ApiKeyRecord, StoreError>;

    /// Looks up an active (non-revoked) API key by its SHA-256 hash.
    async fn find_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError>;

    async fn list_api_keys(&self, org_id: Uuid) -> Result<Vec<ApiKeyRecord>, StoreError>;

    /// Returns whether a key was revoked.
    async fn revoke_api_key(&self, org_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_data_import(&self, import: NewDataImport) -> Result<Uuid, StoreError>;

    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
