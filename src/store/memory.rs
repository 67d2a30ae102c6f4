use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IntegrationStore, StoreError};
use crate::models::{ApiKeyRecord, IntegrationRecord, NewApiKey, NewDataImport, NewIntegration};

/// In-process store. Used in development when `DATABASE_URL` is unset and
/// by the test suite. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    integrations: HashMap<Uuid, IntegrationRecord>,
    api_keys: HashMap<Uuid, ApiKeyRecord>,
    imports: Vec<(Uuid, NewDataImport)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted snapshots (test helper).
    pub async fn import_count(&self) -> usize {
        self.inner.read().await.imports.len()
    }
}

#[async_trait]
impl IntegrationStore for MemoryStore {
    async fn upsert_integration(
        &self,
        new: NewIntegration,
    ) -> Result<IntegrationRecord, StoreError> {
        let mut inner = self.inner.write().await;

        if !new.source.allows_multiple() {
            let existing = inner
                .integrations
                .values_mut()
                .find(|r| r.org_id == new.org_id && r.source == new.source);
            if let Some(record) = existing {
                record.display_name = new.display_name;
                record.credentials_encrypted = new.credentials_encrypted;
                record.scopes = new.scopes;
                return Ok(record.clone());
            }
        }

        let record = IntegrationRecord {
            id: Uuid::new_v4(),
            org_id: new.org_id,
            source: new.source,
            display_name: new.display_name,
            credentials_encrypted: new.credentials_encrypted,
            scopes: new.scopes,
            created_at: Utc::now(),
            last_synced_at: None,
        };
        inner.integrations.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_integration(&self, id: Uuid) -> Result<Option<IntegrationRecord>, StoreError> {
        Ok(self.inner.read().await.integrations.get(&id).cloned())
    }

    async fn list_integrations(&self, org_id: Uuid) -> Result<Vec<IntegrationRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut records: Vec<IntegrationRecord> = inner
            .integrations
            .values()
            .filter(|r| r.org_id == org_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn update_last_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.integrations.get_mut(&id) {
            record.last_synced_at = Some(at);
        }
        Ok(())
    }

    async fn delete_integration(&self, org_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let matches = inner
            .integrations
            .get(&id)
            .is_some_and(|r| r.org_id == org_id);
        if matches {
            inner.integrations.remove(&id);
        }
        Ok(matches)
    }

    async fn insert_api_key(&self, new: NewApiKey) -> Result<ApiKeyRecord, StoreError> {
        let record = ApiKeyRecord {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            name: new.name,
            key_prefix: new.key_prefix,
            key_hash: new.key_hash,
            scopes: new.scopes,
            created_by: new.created_by,
            created_at: Utc::now(),
            revoked_at: None,
        };
        self.inner
            .write()
            .await
            .api_keys
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .api_keys
            .values()
            .find(|k| k.key_hash == key_hash && k.revoked_at.is_none())
            .cloned())
    }

    async fn list_api_keys(&self, org_id: Uuid) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut keys: Vec<ApiKeyRecord> = inner
            .api_keys
            .values()
            .filter(|k| k.organization_id == org_id && k.revoked_at.is_none())
            .cloned()
            .collect();
        keys.sort_by_key(|k| k.created_at);
        Ok(keys)
    }

    async fn revoke_api_key(&self, org_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.api_keys.get_mut(&id) {
            Some(key) if key.organization_id == org_id && key.revoked_at.is_none() => {
                key.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_data_import(&self, import: NewDataImport) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.inner.write().await.imports.push((id, import));
        Ok(id)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
