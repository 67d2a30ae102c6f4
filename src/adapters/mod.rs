// ============================================
// Source Adapters
// ============================================
//
// Each adapter translates the generic "fetch data_type with options"
// contract into one vendor's API calls. Adapters are registered in a map
// keyed by `Source` — dispatch never goes through raw strings.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RetrievalError;
use crate::models::{Credentials, FetchOptions, Source};

pub mod acuity;
pub mod google;
pub mod synthetic;

pub use acuity::AcuityAdapter;
pub use google::GoogleAdapter;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Data types this adapter can serve, in preference order. Must be
    /// non-empty: an adapter that serves nothing should not be registered,
    /// and `default_data_type` takes the first entry.
    fn supported_data_types(&self) -> &'static [&'static str];

    fn default_data_type(&self) -> &'static str {
        self.supported_data_types()[0]
    }

    fn ensure_supported(&self, data_type: &str) -> Result<(), RetrievalError> {
        if self.supported_data_types().contains(&data_type) {
            Ok(())
        } else {
            Err(RetrievalError::UnsupportedDataType {
                integration_source: self.source(),
                data_type: data_type.to_string(),
                supported: self.supported_data_types().join(", "),
            })
        }
    }

    /// Fetch records of `data_type` from the vendor API.
    async fn fetch(
        &self,
        credentials: &Credentials,
        data_type: &str,
        options: &FetchOptions,
    ) -> Result<Vec<serde_json::Value>, RetrievalError>;
}

/// Adapter map keyed by source.
pub struct AdapterRegistry {
    adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with every production adapter. Plaid and QuickBooks have no
    /// adapter yet; retrieving from them directly is an unsupported-type
    /// error rather than a silent no-op.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AcuityAdapter::new()));
        registry.register(Arc::new(GoogleAdapter::new()));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.source(), adapter);
    }

    pub fn get(&self, source: Source) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&source)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_acuity_and_google() {
        let registry = AdapterRegistry::with_defaults();
        assert!(registry.get(Source::Acuity).is_some());
        assert!(registry.get(Source::Google).is_some());
        assert!(registry.get(Source::Plaid).is_none());
        assert!(registry.get(Source::Quickbooks).is_none());
    }

    #[test]
    fn registered_adapters_have_a_default_data_type() {
        let registry = AdapterRegistry::with_defaults();
        for source in [Source::Acuity, Source::Google] {
            let adapter = registry.get(source).unwrap();
            assert!(!adapter.supported_data_types().is_empty());
            assert_eq!(
                adapter.default_data_type(),
                adapter.supported_data_types()[0]
            );
        }
    }

    #[test]
    fn ensure_supported_names_the_supported_set() {
        let adapter = AcuityAdapter::new();
        let err = adapter.ensure_supported("invoices").unwrap_err();
        match err {
            RetrievalError::UnsupportedDataType {
                integration_source,
                data_type,
                supported,
            } => {
                assert_eq!(integration_source, Source::Acuity);
                assert_eq!(data_type, "invoices");
                assert!(supported.contains("appointments"));
                assert!(supported.contains("clients"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
