// Configuration module

use anyhow::{Result, bail};
use serde::Deserialize;

const DEV_ENCRYPTION_KEY: &str = "dev-encryption-key-change-in-production";
const DEV_ADMIN_TOKEN: &str = "dev-admin-token-change-in-production";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Absent in development runs the in-memory store.
    pub database_url: Option<String>,
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    /// Secret the credential cipher derives its keys from. Required
    /// outside development.
    pub encryption_key: Option<String>,
    /// Bearer token for the key-management endpoints. Required outside
    /// development.
    pub admin_token: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    /// Serve deterministic synthetic data instead of calling vendors.
    #[serde(default)]
    pub demo_mode: bool,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_fetch_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Missing ENCRYPTION_KEY is a deployment blocker outside development;
    /// the process refuses to start rather than falling back to a baked-in
    /// secret.
    pub fn resolve_encryption_key(&self) -> Result<String> {
        match &self.encryption_key {
            Some(key) if !key.is_empty() => Ok(key.clone()),
            _ if self.is_development() => {
                tracing::warn!(
                    "ENCRYPTION_KEY not set; using the development key. \
                     Credentials encrypted with it are not secure."
                );
                Ok(DEV_ENCRYPTION_KEY.to_string())
            }
            _ => bail!(
                "ENCRYPTION_KEY must be set when ENVIRONMENT is {:?}",
                self.environment
            ),
        }
    }

    pub fn resolve_admin_token(&self) -> Result<String> {
        match &self.admin_token {
            Some(token) if !token.is_empty() => Ok(token.clone()),
            _ if self.is_development() => {
                tracing::warn!("ADMIN_TOKEN not set; using the development token.");
                Ok(DEV_ADMIN_TOKEN.to_string())
            }
            _ => bail!(
                "ADMIN_TOKEN must be set when ENVIRONMENT is {:?}",
                self.environment
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            server_host: default_host(),
            server_port: default_port(),
            encryption_key: None,
            admin_token: None,
            environment: Environment::Development,
            demo_mode: false,
            fetch_timeout_secs: default_fetch_timeout(),
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_falls_back_to_dev_secrets() {
        let config = Config::default();
        assert_eq!(config.resolve_encryption_key().unwrap(), DEV_ENCRYPTION_KEY);
        assert_eq!(config.resolve_admin_token().unwrap(), DEV_ADMIN_TOKEN);
    }

    #[test]
    fn production_without_encryption_key_refuses_to_start() {
        let config = Config {
            environment: Environment::Production,
            ..Config::default()
        };
        assert!(config.resolve_encryption_key().is_err());
        assert!(config.resolve_admin_token().is_err());

        let config = Config {
            environment: Environment::Production,
            encryption_key: Some("real-secret".into()),
            admin_token: Some("real-token".into()),
            ..Config::default()
        };
        assert_eq!(config.resolve_encryption_key().unwrap(), "real-secret");
        assert_eq!(config.resolve_admin_token().unwrap(), "real-token");
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let config = Config {
            environment: Environment::Staging,
            encryption_key: Some(String::new()),
            ..Config::default()
        };
        assert!(config.resolve_encryption_key().is_err());
    }
}
