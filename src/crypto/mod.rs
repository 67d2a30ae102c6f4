// ============================================
// AES-256-GCM Credential Store
// ============================================
//
// Integration secrets are encrypted at rest. Each call generates a fresh
// random salt and nonce, derives a 256-bit key from the server-side secret
// with Argon2, and stores `salt || nonce || tag || ciphertext`, base64-encoded.
// There is no key rotation or blob versioning yet.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use argon2::Argon2;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use thiserror::Error;

use crate::models::Credentials;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("encryption failed: {0}")]
    Cipher(String),
}

#[derive(Debug, Error)]
pub enum DecryptionError {
    #[error("credential blob is malformed: {0}")]
    Malformed(String),
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    /// The authentication tag did not verify — the blob was tampered with
    /// or encrypted under a different key.
    #[error("authentication tag verification failed")]
    Verification,
}

/// Encrypts and decrypts integration credentials with a key derived from
/// a single server-side secret (`ENCRYPTION_KEY`).
pub struct CredentialStore {
    secret: Vec<u8>,
}

impl CredentialStore {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// Derive a 256-bit key from the secret and a per-record salt.
    /// Argon2 is deliberately slow; credentials are encrypted/decrypted
    /// rarely enough that this is not a hot path.
    fn derive_key(&self, salt: &[u8]) -> Result<[u8; 32], argon2::Error> {
        let mut key = [0u8; 32];
        Argon2::default().hash_password_into(&self.secret, salt, &mut key)?;
        Ok(key)
    }

    /// Encrypt plaintext bytes.
    /// Returns base64 of: salt(16) || nonce(12) || tag(16) || ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, EncryptionError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let key = self
            .derive_key(&salt)
            .map_err(|e| EncryptionError::KeyDerivation(e.to_string()))?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| EncryptionError::Cipher(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the tag to the ciphertext; the blob layout puts
        // the tag before the ciphertext, so split it back out.
        let mut ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| EncryptionError::Cipher(e.to_string()))?;
        let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);

        let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&tag);
        blob.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&blob))
    }

    /// Decrypt a base64 blob produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>, DecryptionError> {
        let raw = BASE64
            .decode(blob)
            .map_err(|e| DecryptionError::Malformed(format!("base64 decode failed: {}", e)))?;

        if raw.len() < HEADER_LEN {
            return Err(DecryptionError::Malformed(format!(
                "blob too short: {} bytes, need at least {}",
                raw.len(),
                HEADER_LEN
            )));
        }

        let (salt, rest) = raw.split_at(SALT_LEN);
        let (nonce_bytes, rest) = rest.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let key = self
            .derive_key(salt)
            .map_err(|e| DecryptionError::KeyDerivation(e.to_string()))?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| DecryptionError::KeyDerivation(e.to_string()))?;

        let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        combined.extend_from_slice(ciphertext);
        combined.extend_from_slice(tag);

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), combined.as_slice())
            .map_err(|_| DecryptionError::Verification)
    }

    /// Encrypt a typed credential as JSON.
    pub fn encrypt_credentials(&self, credentials: &Credentials) -> Result<String, EncryptionError> {
        let plaintext = serde_json::to_vec(credentials)
            .map_err(|e| EncryptionError::Cipher(format!("serialization failed: {}", e)))?;
        self.encrypt(&plaintext)
    }

    /// Decrypt a blob back into a typed credential.
    pub fn decrypt_credentials(&self, blob: &str) -> Result<Credentials, DecryptionError> {
        let plaintext = self.decrypt(blob)?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            DecryptionError::Malformed(format!("decrypted payload is not valid credential JSON: {}", e))
        })
    }
}
