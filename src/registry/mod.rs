// ============================================
// Integration Registry
// ============================================
//
// Per-organization integration records with transparent credential
// encryption. Callers receive decrypted credentials only for the duration
// of an API call and must never persist them.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::CredentialStore;
use crate::error::RetrievalError;
use crate::models::{
    Credentials, DecryptedIntegration, IntegrationRecord, NewIntegration, Source,
};
use crate::store::IntegrationStore;

#[derive(Clone)]
pub struct IntegrationRegistry {
    store: Arc<dyn IntegrationStore>,
    crypto: Arc<CredentialStore>,
}

impl IntegrationRegistry {
    pub fn new(store: Arc<dyn IntegrationStore>, crypto: Arc<CredentialStore>) -> Self {
        Self { store, crypto }
    }

    /// Connect (or reconnect) an integration. For single-account sources
    /// the existing (org, source) record is updated in place; Google gets
    /// a new record per account.
    pub async fn connect(
        &self,
        org_id: Uuid,
        source: Source,
        display_name: String,
        scopes: Vec<String>,
        credentials: &Credentials,
    ) -> Result<IntegrationRecord, RetrievalError> {
        let credentials_encrypted = self.crypto.encrypt_credentials(credentials)?;
        let record = self
            .store
            .upsert_integration(NewIntegration {
                org_id,
                source,
                display_name,
                credentials_encrypted,
                scopes,
            })
            .await?;
        tracing::info!(
            integration_id = %record.id,
            org_id = %org_id,
            source = %source,
            "integration connected"
        );
        Ok(record)
    }

    pub async fn list(&self, org_id: Uuid) -> Result<Vec<IntegrationRecord>, RetrievalError> {
        Ok(self.store.list_integrations(org_id).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<IntegrationRecord, RetrievalError> {
        self.store
            .find_integration(id)
            .await?
            .ok_or(RetrievalError::IntegrationNotFound(id))
    }

    /// First integration for (org, source), if any.
    pub async fn find_by_source(
        &self,
        org_id: Uuid,
        source: Source,
    ) -> Result<Option<IntegrationRecord>, RetrievalError> {
        let records = self.store.list_integrations(org_id).await?;
        Ok(records.into_iter().find(|r| r.source == source))
    }

    /// Fetch a record with its credentials decrypted in memory.
    pub async fn get_decrypted(&self, id: Uuid) -> Result<DecryptedIntegration, RetrievalError> {
        let record = self.get(id).await?;
        let credentials = self.decrypt_credentials(&record)?;
        Ok(DecryptedIntegration {
            record,
            credentials,
        })
    }

    pub fn decrypt_credentials(
        &self,
        record: &IntegrationRecord,
    ) -> Result<Credentials, RetrievalError> {
        Ok(self
            .crypto
            .decrypt_credentials(&record.credentials_encrypted)?)
    }

    /// Optimistic `last_synced_at` update after a successful fetch.
    /// Best effort — a failure here never fails the retrieval.
    pub async fn mark_synced(&self, id: Uuid) {
        if let Err(err) = self.store.update_last_synced(id, Utc::now()).await {
            tracing::warn!(integration_id = %id, error = %err, "failed to update last_synced_at");
        }
    }

    pub async fn disconnect(&self, org_id: Uuid, id: Uuid) -> Result<bool, RetrievalError> {
        let deleted = self.store.delete_integration(org_id, id).await?;
        if deleted {
            tracing::info!(integration_id = %id, org_id = %org_id, "integration disconnected");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> IntegrationRegistry {
        IntegrationRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CredentialStore::new("registry-test-secret")),
        )
    }

    fn acuity_creds() -> Credentials {
        Credentials::ApiKey {
            user_id: "acuity-user".into(),
            api_key: "acuity-secret".into(),
        }
    }

    #[tokio::test]
    async fn connect_stores_only_ciphertext() {
        let registry = registry();
        let org = Uuid::new_v4();
        let record = registry
            .connect(org, Source::Acuity, "Acuity".into(), vec![], &acuity_creds())
            .await
            .unwrap();

        assert!(!record.credentials_encrypted.contains("acuity-secret"));

        let decrypted = registry.get_decrypted(record.id).await.unwrap();
        match decrypted.credentials {
            Credentials::ApiKey { api_key, .. } => assert_eq!(api_key, "acuity-secret"),
            _ => panic!("wrong credential type"),
        }
    }

    #[tokio::test]
    async fn get_unknown_integration_is_not_found() {
        let registry = registry();
        let id = Uuid::new_v4();
        assert!(matches!(
            registry.get(id).await,
            Err(RetrievalError::IntegrationNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn decryption_with_tampered_blob_is_fatal() {
        let registry = registry();
        let org = Uuid::new_v4();
        let record = registry
            .connect(org, Source::Acuity, "Acuity".into(), vec![], &acuity_creds())
            .await
            .unwrap();

        let mut tampered = record.clone();
        tampered.credentials_encrypted = "bm90IGEgcmVhbCBibG9i".into();
        assert!(matches!(
            registry.decrypt_credentials(&tampered),
            Err(RetrievalError::Decryption(_))
        ));
    }

    #[tokio::test]
    async fn find_by_source_scopes_to_org() {
        let registry = registry();
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        registry
            .connect(org_a, Source::Acuity, "A".into(), vec![], &acuity_creds())
            .await
            .unwrap();

        assert!(registry
            .find_by_source(org_a, Source::Acuity)
            .await
            .unwrap()
            .is_some());
        assert!(registry
            .find_by_source(org_b, Source::Acuity)
            .await
            .unwrap()
            .is_none());
        assert!(registry
            .find_by_source(org_a, Source::Google)
            .await
            .unwrap()
            .is_none());
    }
}
