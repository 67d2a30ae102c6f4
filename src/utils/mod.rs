// Utility functions

use sha2::{Digest, Sha256};

/// Hash an API key for storage
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generate a new API key. Returns (full key, display prefix); only the
/// hash of the full key is ever stored.
pub fn generate_api_key() -> (String, String) {
    let key = format!("fin_{}", uuid::Uuid::new_v4().simple());
    let prefix = key[..12].to_string();
    (key, prefix)
}
