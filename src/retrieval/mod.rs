// ============================================
// Data Retrieval Orchestrator
// ============================================
//
// Fans out across an organization's connected integrations and normalizes
// everything into the `RetrievedData` envelope. Fan-out is bounded-
// concurrency with a per-call timeout; one integration's failure never
// aborts the batch. Result order across sources is unspecified.
//
// Synthetic data is served only in demo mode — production errors are
// logged and skipped, never silently replaced with mock records.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::adapters::{AdapterRegistry, SourceAdapter, synthetic};
use crate::error::RetrievalError;
use crate::models::{
    DEFAULT_LIMIT, FetchOptions, IntegrationRecord, RetrievalMetadata, RetrievedData, Source,
};
use crate::registry::IntegrationRegistry;

/// Sources the demo-mode batch covers when an org has no integrations.
pub const SYNTHETIC_SOURCES: [Source; 3] = [Source::Google, Source::Acuity, Source::Plaid];

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Serve deterministic synthetic data instead of calling vendor APIs.
    pub demo_mode: bool,
    /// Per-adapter-call timeout inside the fan-out.
    pub fetch_timeout: Duration,
    /// Maximum adapter calls in flight during a fan-out.
    pub fetch_concurrency: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            demo_mode: false,
            fetch_timeout: Duration::from_secs(30),
            fetch_concurrency: 4,
        }
    }
}

pub struct DataRetrievalService {
    registry: IntegrationRegistry,
    adapters: Arc<AdapterRegistry>,
    settings: RetrievalSettings,
}

impl DataRetrievalService {
    pub fn new(
        registry: IntegrationRegistry,
        adapters: Arc<AdapterRegistry>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            registry,
            adapters,
            settings,
        }
    }

    /// Retrieve one data type from a single integration. Errors propagate
    /// to the caller; credential-decryption failures are fatal for the
    /// fetch.
    pub async fn retrieve_from_integration(
        &self,
        integration_id: Uuid,
        data_type: Option<&str>,
        options: &FetchOptions,
    ) -> Result<RetrievedData, RetrievalError> {
        let record = self.registry.get(integration_id).await?;
        self.retrieve_from_record(&record, data_type, options).await
    }

    /// Fan out across every integration the org has connected, skipping
    /// individual failures. With demo mode on, an empty or unlistable
    /// registry yields the fixed synthetic source set instead.
    pub async fn retrieve_from_all(
        &self,
        org_id: Uuid,
        data_types: &[String],
        options: &FetchOptions,
    ) -> Result<Vec<RetrievedData>, RetrievalError> {
        let integrations = match self.registry.list(org_id).await {
            Ok(integrations) => integrations,
            Err(err) if self.settings.demo_mode => {
                tracing::warn!(
                    org_id = %org_id,
                    error = %err,
                    "integration listing failed; serving synthetic demo data"
                );
                return Ok(self.synthetic_batch(options));
            }
            Err(err) => return Err(err),
        };

        if integrations.is_empty() {
            if self.settings.demo_mode {
                return Ok(self.synthetic_batch(options));
            }
            return Ok(Vec::new());
        }

        let concurrency = self.settings.fetch_concurrency.max(1);
        let outcomes: Vec<(IntegrationRecord, Result<RetrievedData, RetrievalError>)> =
            stream::iter(integrations)
                .map(|integration| async move {
                    let requested = self.pick_data_type(integration.source, data_types);
                    let outcome = self
                        .retrieve_from_record(&integration, requested, options)
                        .await;
                    (integration, outcome)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        let mut data = Vec::with_capacity(outcomes.len());
        for (integration, outcome) in outcomes {
            match outcome {
                Ok(retrieved) => data.push(retrieved),
                Err(err) => {
                    // Best-effort batch: log and skip, return partial results.
                    tracing::warn!(
                        integration_id = %integration.id,
                        source = %integration.source,
                        error = %err,
                        "skipping integration after retrieval failure"
                    );
                }
            }
        }
        Ok(data)
    }

    async fn retrieve_from_record(
        &self,
        record: &IntegrationRecord,
        data_type: Option<&str>,
        options: &FetchOptions,
    ) -> Result<RetrievedData, RetrievalError> {
        let adapter = self.adapters.get(record.source).ok_or_else(|| {
            RetrievalError::UnsupportedDataType {
                integration_source: record.source,
                data_type: data_type
                    .unwrap_or(synthetic::default_data_type(record.source))
                    .to_string(),
                supported: "none (no adapter registered)".to_string(),
            }
        })?;

        let data_type = data_type.unwrap_or(adapter.default_data_type());
        adapter.ensure_supported(data_type)?;

        let limit = options.limit_or(DEFAULT_LIMIT);
        let (mut records, credential_audit) = if self.settings.demo_mode {
            (synthetic::synthetic_records(record.source, data_type, limit), None)
        } else {
            let credentials = self.registry.decrypt_credentials(record)?;
            let fetched = match timeout(
                self.settings.fetch_timeout,
                adapter.fetch(&credentials, data_type, options),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(RetrievalError::Timeout {
                        integration_source: record.source,
                        timeout_secs: self.settings.fetch_timeout.as_secs(),
                    });
                }
            };
            (fetched, Some(credentials.redacted()))
        };
        records.truncate(limit);

        self.registry.mark_synced(record.id).await;

        Ok(RetrievedData {
            source: record.source,
            data_type: data_type.to_string(),
            metadata: RetrievalMetadata {
                total_count: records.len(),
                retrieved_at: Utc::now(),
                integration_id: Some(record.id),
                credentials: credential_audit,
            },
            records,
        })
    }

    fn synthetic_batch(&self, options: &FetchOptions) -> Vec<RetrievedData> {
        let limit = options.limit_or(DEFAULT_LIMIT);
        SYNTHETIC_SOURCES
            .iter()
            .map(|&source| {
                let data_type = synthetic::default_data_type(source);
                let records = synthetic::synthetic_records(source, data_type, limit);
                RetrievedData {
                    source,
                    data_type: data_type.to_string(),
                    metadata: RetrievalMetadata {
                        total_count: records.len(),
                        retrieved_at: Utc::now(),
                        integration_id: None,
                        credentials: None,
                    },
                    records,
                }
            })
            .collect()
    }

    /// First requested data type the source's adapter supports; `None`
    /// falls back to the adapter default.
    fn pick_data_type<'a>(&self, source: Source, data_types: &'a [String]) -> Option<&'a str> {
        let adapter = self.adapters.get(source)?;
        data_types
            .iter()
            .map(String::as_str)
            .find(|dt| adapter.supported_data_types().contains(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::GoogleAdapter;
    use crate::crypto::CredentialStore;
    use crate::models::Credentials;
    use crate::store::{IntegrationStore, MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct StubAdapter {
        source: Source,
        data_types: &'static [&'static str],
        records: Vec<serde_json::Value>,
    }

    #[async_trait]
    impl SourceAdapter for StubAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn supported_data_types(&self) -> &'static [&'static str] {
            self.data_types
        }
        async fn fetch(
            &self,
            _credentials: &Credentials,
            data_type: &str,
            _options: &FetchOptions,
        ) -> Result<Vec<serde_json::Value>, RetrievalError> {
            self.ensure_supported(data_type)?;
            Ok(self.records.clone())
        }
    }

    struct FailingAdapter {
        source: Source,
    }

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn supported_data_types(&self) -> &'static [&'static str] {
            &["appointments"]
        }
        async fn fetch(
            &self,
            _credentials: &Credentials,
            _data_type: &str,
            _options: &FetchOptions,
        ) -> Result<Vec<serde_json::Value>, RetrievalError> {
            Err(RetrievalError::Upstream {
                integration_source: self.source,
                detail: "simulated outage".into(),
            })
        }
    }

    struct SlowAdapter;

    #[async_trait]
    impl SourceAdapter for SlowAdapter {
        fn source(&self) -> Source {
            Source::Acuity
        }
        fn supported_data_types(&self) -> &'static [&'static str] {
            &["appointments"]
        }
        async fn fetch(
            &self,
            _credentials: &Credentials,
            _data_type: &str,
            _options: &FetchOptions,
        ) -> Result<Vec<serde_json::Value>, RetrievalError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    fn acuity_creds() -> Credentials {
        Credentials::ApiKey {
            user_id: "u".into(),
            api_key: "k".into(),
        }
    }

    fn oauth_creds() -> Credentials {
        Credentials::Oauth {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    fn service_with(
        store: Arc<MemoryStore>,
        adapters: AdapterRegistry,
        settings: RetrievalSettings,
    ) -> (DataRetrievalService, IntegrationRegistry) {
        let registry = IntegrationRegistry::new(
            store,
            Arc::new(CredentialStore::new("retrieval-test-secret")),
        );
        let service =
            DataRetrievalService::new(registry.clone(), Arc::new(adapters), settings);
        (service, registry)
    }

    fn demo_settings() -> RetrievalSettings {
        RetrievalSettings {
            demo_mode: true,
            ..RetrievalSettings::default()
        }
    }

    #[tokio::test]
    async fn demo_mode_with_zero_integrations_returns_fixed_synthetic_set() {
        let (service, _) = service_with(
            Arc::new(MemoryStore::new()),
            AdapterRegistry::with_defaults(),
            demo_settings(),
        );

        let options = FetchOptions {
            limit: Some(4),
            ..FetchOptions::default()
        };
        let data = service
            .retrieve_from_all(Uuid::new_v4(), &[], &options)
            .await
            .unwrap();

        let sources: HashSet<Source> = data.iter().map(|d| d.source).collect();
        assert_eq!(sources, HashSet::from(SYNTHETIC_SOURCES));
        for retrieved in &data {
            assert!(retrieved.records.len() <= 4);
            assert_eq!(retrieved.metadata.total_count, retrieved.records.len());
            assert!(retrieved.metadata.integration_id.is_none());
        }
    }

    #[tokio::test]
    async fn production_mode_with_zero_integrations_returns_empty() {
        let (service, _) = service_with(
            Arc::new(MemoryStore::new()),
            AdapterRegistry::with_defaults(),
            RetrievalSettings::default(),
        );
        let data = service
            .retrieve_from_all(Uuid::new_v4(), &[], &FetchOptions::default())
            .await
            .unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn fan_out_continues_past_a_failing_integration() {
        let org = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());

        let mut adapters = AdapterRegistry::new();
        adapters.register(Arc::new(FailingAdapter {
            source: Source::Acuity,
        }));
        adapters.register(Arc::new(GoogleAdapter::new()));
        adapters.register(Arc::new(StubAdapter {
            source: Source::Plaid,
            data_types: &["transactions"],
            records: vec![serde_json::json!({"transaction_id": "txn-1"})],
        }));

        let (service, registry) =
            service_with(store, adapters, RetrievalSettings::default());
        registry
            .connect(org, Source::Acuity, "A".into(), vec![], &acuity_creds())
            .await
            .unwrap();
        registry
            .connect(org, Source::Google, "G".into(), vec![], &oauth_creds())
            .await
            .unwrap();
        registry
            .connect(org, Source::Plaid, "P".into(), vec![], &oauth_creds())
            .await
            .unwrap();

        let data = service
            .retrieve_from_all(org, &[], &FetchOptions::default())
            .await
            .unwrap();

        // Acuity failed and was skipped; Google and Plaid still answered.
        let sources: HashSet<Source> = data.iter().map(|d| d.source).collect();
        assert_eq!(sources, HashSet::from([Source::Google, Source::Plaid]));
    }

    #[tokio::test]
    async fn no_registered_adapter_is_an_unsupported_data_type_error() {
        let org = Uuid::new_v4();
        let (service, registry) = service_with(
            Arc::new(MemoryStore::new()),
            AdapterRegistry::with_defaults(),
            RetrievalSettings::default(),
        );
        let record = registry
            .connect(org, Source::Plaid, "P".into(), vec![], &oauth_creds())
            .await
            .unwrap();

        let err = service
            .retrieve_from_integration(record.id, Some("transactions"), &FetchOptions::default())
            .await
            .unwrap_err();
        match err {
            RetrievalError::UnsupportedDataType {
                integration_source,
                data_type,
                ..
            } => {
                assert_eq!(integration_source, Source::Plaid);
                assert_eq!(data_type, "transactions");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn demo_acuity_appointments_respect_limit_and_shape() {
        let org = Uuid::new_v4();
        let (service, registry) = service_with(
            Arc::new(MemoryStore::new()),
            AdapterRegistry::with_defaults(),
            demo_settings(),
        );
        let record = registry
            .connect(org, Source::Acuity, "A".into(), vec![], &acuity_creds())
            .await
            .unwrap();

        let options = FetchOptions {
            limit: Some(5),
            ..FetchOptions::default()
        };
        let retrieved = service
            .retrieve_from_integration(record.id, Some("appointments"), &options)
            .await
            .unwrap();

        assert_eq!(retrieved.source, Source::Acuity);
        assert_eq!(retrieved.data_type, "appointments");
        assert!(retrieved.records.len() <= 5);
        for r in &retrieved.records {
            assert!(r.get("id").is_some());
            assert!(r.get("datetime").is_some());
            assert!(r["client"]["email"].is_string());
        }

        // Optimistic sync-timestamp update.
        let reloaded = registry.get(record.id).await.unwrap();
        assert!(reloaded.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn google_sheets_stub_returns_empty_without_error() {
        let org = Uuid::new_v4();
        let (service, registry) = service_with(
            Arc::new(MemoryStore::new()),
            AdapterRegistry::with_defaults(),
            RetrievalSettings::default(),
        );
        let record = registry
            .connect(org, Source::Google, "G".into(), vec![], &oauth_creds())
            .await
            .unwrap();

        let retrieved = service
            .retrieve_from_integration(record.id, Some("sheets"), &FetchOptions::default())
            .await
            .unwrap();

        assert!(retrieved.records.is_empty());
        assert_eq!(retrieved.metadata.total_count, 0);
    }

    #[tokio::test]
    async fn audit_metadata_redacts_secrets() {
        let org = Uuid::new_v4();
        let mut adapters = AdapterRegistry::new();
        adapters.register(Arc::new(StubAdapter {
            source: Source::Acuity,
            data_types: &["appointments"],
            records: vec![],
        }));
        let (service, registry) =
            service_with(Arc::new(MemoryStore::new()), adapters, RetrievalSettings::default());
        let record = registry
            .connect(
                org,
                Source::Acuity,
                "A".into(),
                vec![],
                &Credentials::ApiKey {
                    user_id: "u".into(),
                    api_key: "top-secret-key".into(),
                },
            )
            .await
            .unwrap();

        let retrieved = service
            .retrieve_from_integration(record.id, None, &FetchOptions::default())
            .await
            .unwrap();

        let audit = serde_json::to_string(&retrieved.metadata.credentials.unwrap()).unwrap();
        assert!(!audit.contains("top-secret-key"));
        assert!(audit.contains("***"));
    }

    #[tokio::test]
    async fn slow_adapter_call_times_out() {
        let org = Uuid::new_v4();
        let mut adapters = AdapterRegistry::new();
        adapters.register(Arc::new(SlowAdapter));
        let settings = RetrievalSettings {
            fetch_timeout: Duration::from_millis(20),
            ..RetrievalSettings::default()
        };
        let (service, registry) =
            service_with(Arc::new(MemoryStore::new()), adapters, settings);
        let record = registry
            .connect(org, Source::Acuity, "A".into(), vec![], &acuity_creds())
            .await
            .unwrap();

        let err = service
            .retrieve_from_integration(record.id, None, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Timeout { .. }));
    }

    #[tokio::test]
    async fn listing_failure_in_demo_mode_degrades_to_synthetic() {
        struct BrokenStore;

        #[async_trait]
        impl IntegrationStore for BrokenStore {
            async fn upsert_integration(
                &self,
                _new: crate::models::NewIntegration,
            ) -> Result<IntegrationRecord, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn find_integration(
                &self,
                _id: Uuid,
            ) -> Result<Option<IntegrationRecord>, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn list_integrations(
                &self,
                _org_id: Uuid,
            ) -> Result<Vec<IntegrationRecord>, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn update_last_synced(
                &self,
                _id: Uuid,
                _at: chrono::DateTime<chrono::Utc>,
            ) -> Result<(), StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn delete_integration(&self, _org_id: Uuid, _id: Uuid) -> Result<bool, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn insert_api_key(
                &self,
                _new: crate::models::NewApiKey,
            ) -> Result<crate::models::ApiKeyRecord, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn find_api_key_by_hash(
                &self,
                _key_hash: &str,
            ) -> Result<Option<crate::models::ApiKeyRecord>, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn list_api_keys(
                &self,
                _org_id: Uuid,
            ) -> Result<Vec<crate::models::ApiKeyRecord>, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn revoke_api_key(&self, _org_id: Uuid, _id: Uuid) -> Result<bool, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn insert_data_import(
                &self,
                _import: crate::models::NewDataImport,
            ) -> Result<Uuid, StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
            async fn ping(&self) -> Result<(), StoreError> {
                Err(StoreError::Unavailable("down".into()))
            }
        }

        let registry = IntegrationRegistry::new(
            Arc::new(BrokenStore),
            Arc::new(CredentialStore::new("s")),
        );
        let service = DataRetrievalService::new(
            registry,
            Arc::new(AdapterRegistry::with_defaults()),
            demo_settings(),
        );

        let data = service
            .retrieve_from_all(Uuid::new_v4(), &[], &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(data.len(), SYNTHETIC_SOURCES.len());

        // Outside demo mode the same failure propagates.
        let registry = IntegrationRegistry::new(
            Arc::new(BrokenStore),
            Arc::new(CredentialStore::new("s")),
        );
        let service = DataRetrievalService::new(
            registry,
            Arc::new(AdapterRegistry::with_defaults()),
            RetrievalSettings::default(),
        );
        assert!(service
            .retrieve_from_all(Uuid::new_v4(), &[], &FetchOptions::default())
            .await
            .is_err());
    }
}
