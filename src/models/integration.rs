use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================
// Sources
// ============================================

/// External data sources an organization can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Acuity,
    Google,
    Plaid,
    Quickbooks,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Acuity => "acuity",
            Source::Google => "google",
            Source::Plaid => "plaid",
            Source::Quickbooks => "quickbooks",
        }
    }

    /// Google supports multiple accounts/service accounts per organization.
    /// Every other source is limited to one integration per (org, source) pair.
    pub fn allows_multiple(&self) -> bool {
        matches!(self, Source::Google)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acuity" => Ok(Source::Acuity),
            "google" => Ok(Source::Google),
            "plaid" => Ok(Source::Plaid),
            "quickbooks" => Ok(Source::Quickbooks),
            other => Err(format!("unknown integration source '{}'", other)),
        }
    }
}

// ============================================
// Credentials
// ============================================

/// Source-specific secrets. Stored only as an encrypted blob; decrypted
/// transiently in memory for the duration of an API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// API key + user id (Acuity).
    ApiKey { user_id: String, api_key: String },
    /// OAuth token pair (Google user accounts).
    Oauth {
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Service-account JSON (Google server-to-server).
    ServiceAccount { json: serde_json::Value },
}

impl Credentials {
    /// Audit-safe view with every secret field replaced by `"***"`.
    pub fn redacted(&self) -> serde_json::Value {
        match self {
            Credentials::ApiKey { user_id, .. } => json!({
                "type": "api_key",
                "user_id": user_id,
                "api_key": "***",
            }),
            Credentials::Oauth {
                refresh_token,
                expires_at,
                ..
            } => json!({
                "type": "oauth",
                "access_token": "***",
                "refresh_token": refresh_token.as_ref().map(|_| "***"),
                "expires_at": expires_at,
            }),
            Credentials::ServiceAccount { .. } => json!({
                "type": "service_account",
                "json": "***",
            }),
        }
    }
}

// ============================================
// Integration records
// ============================================

/// A configured connection from an organization to one external source.
/// The credential blob is AES-256-GCM encrypted; it is never serialized
/// in API responses.
#[derive(Debug, Clone)]
pub struct IntegrationRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source: Source,
    pub display_name: String,
    pub credentials_encrypted: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Input for creating (or upserting) an integration.
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub org_id: Uuid,
    pub source: Source,
    pub display_name: String,
    pub credentials_encrypted: String,
    pub scopes: Vec<String>,
}

/// An integration record with its credentials decrypted in memory.
/// Callers must never persist the decrypted form.
#[derive(Debug)]
pub struct DecryptedIntegration {
    pub record: IntegrationRecord,
    pub credentials: Credentials,
}

// ============================================
// API keys
// ============================================

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub organization_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub created_by: String,
}
