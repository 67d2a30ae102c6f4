use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::integration::Source;

/// Default record cap applied when a request does not specify a limit.
pub const DEFAULT_LIMIT: usize = 100;

// ============================================
// Fetch options
// ============================================

/// Generic options passed to every source adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchOptions {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub filters: Option<serde_json::Value>,
}

impl FetchOptions {
    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }
}

// ============================================
// Retrieved data envelope
// ============================================

/// The normalized envelope returned by any adapter/orchestrator call.
/// Ephemeral — constructed per request, optionally persisted as a
/// `DataImport` snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedData {
    pub source: Source,
    pub data_type: String,
    pub records: Vec<serde_json::Value>,
    pub metadata: RetrievalMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalMetadata {
    pub total_count: usize,
    pub retrieved_at: DateTime<Utc>,
    pub integration_id: Option<Uuid>,
    /// Redacted credential view for audit trails (e.g. `api_key: "***"`).
    /// Absent for synthetic results, which never touch credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<serde_json::Value>,
}

// ============================================
// Persisted snapshots
// ============================================

/// A persisted retrieval snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct NewDataImport {
    pub org_id: Uuid,
    pub file_type: String,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_by: String,
}
