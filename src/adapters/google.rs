use async_trait::async_trait;

use super::SourceAdapter;
use crate::error::RetrievalError;
use crate::models::{Credentials, FetchOptions, Source};

const DATA_TYPES: &[&str] = &["sheets", "calendar", "drive"];

/// Google Workspace adapter. The real Sheets/Calendar/Drive calls are not
/// wired up yet; every supported data type returns an empty result set so
/// callers can distinguish "connected but unimplemented" from an error.
pub struct GoogleAdapter;

impl GoogleAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoogleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for GoogleAdapter {
    fn source(&self) -> Source {
        Source::Google
    }

    fn supported_data_types(&self) -> &'static [&'static str] {
        DATA_TYPES
    }

    async fn fetch(
        &self,
        _credentials: &Credentials,
        data_type: &str,
        _options: &FetchOptions,
    ) -> Result<Vec<serde_json::Value>, RetrievalError> {
        self.ensure_supported(data_type)?;
        tracing::debug!(
            data_type,
            "google adapter is not implemented yet; returning an empty result set"
        );
        Ok(Vec::new())
    }
}
