use async_trait::async_trait;

use super::SourceAdapter;
use crate::error::RetrievalError;
use crate::models::{Credentials, FetchOptions, Source};

const ACUITY_BASE_URL: &str = "https://acuityscheduling.com/api/v1";

const DATA_TYPES: &[&str] = &["appointments", "clients", "appointment_types", "calendars"];

/// Acuity Scheduling adapter. Authenticates with basic auth
/// (user id + API key) against the Acuity REST API.
pub struct AcuityAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl AcuityAdapter {
    pub fn new() -> Self {
        Self::with_base_url(ACUITY_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint_for(data_type: &str) -> Option<&'static str> {
        match data_type {
            "appointments" => Some("appointments"),
            "clients" => Some("clients"),
            "appointment_types" => Some("appointment-types"),
            "calendars" => Some("calendars"),
            _ => None,
        }
    }
}

impl Default for AcuityAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for AcuityAdapter {
    fn source(&self) -> Source {
        Source::Acuity
    }

    fn supported_data_types(&self) -> &'static [&'static str] {
        DATA_TYPES
    }

    async fn fetch(
        &self,
        credentials: &Credentials,
        data_type: &str,
        options: &FetchOptions,
    ) -> Result<Vec<serde_json::Value>, RetrievalError> {
        let endpoint = Self::endpoint_for(data_type).ok_or_else(|| {
            RetrievalError::UnsupportedDataType {
                integration_source: Source::Acuity,
                data_type: data_type.to_string(),
                supported: DATA_TYPES.join(", "),
            }
        })?;

        let Credentials::ApiKey { user_id, api_key } = credentials else {
            return Err(RetrievalError::MissingCredentials {
                integration_source: Source::Acuity,
                detail: "expected api_key credentials with user_id and api_key".into(),
            });
        };

        let mut request = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .basic_auth(user_id, Some(api_key));

        if data_type == "appointments" {
            if let Some(start) = options.start_date {
                request = request.query(&[("minDate", start.format("%Y-%m-%d").to_string())]);
            }
            if let Some(end) = options.end_date {
                request = request.query(&[("maxDate", end.format("%Y-%m-%d").to_string())]);
            }
        }
        if let Some(limit) = options.limit {
            // Acuity has no offset parameter; the offset is applied
            // client-side below, so the server cap must cover both.
            let max = limit + options.offset.unwrap_or(0);
            request = request.query(&[("max", max.to_string())]);
        }

        let response = request.send().await.map_err(|e| RetrievalError::Upstream {
            integration_source: Source::Acuity,
            detail: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Upstream {
                integration_source: Source::Acuity,
                detail: format!("HTTP {} from /{}", status, endpoint),
            });
        }

        let mut records: Vec<serde_json::Value> =
            response.json().await.map_err(|e| RetrievalError::Upstream {
                integration_source: Source::Acuity,
                detail: format!("invalid response body: {}", e),
            })?;

        if let Some(offset) = options.offset {
            records = records.into_iter().skip(offset).collect();
        }
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }

        Ok(records)
    }
}
