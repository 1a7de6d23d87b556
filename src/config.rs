//! Configuration Management
//!
//! Loads the tstack configuration file and applies environment overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default seconds between status checks
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
/// Default seconds to wait for a status change
pub const DEFAULT_WAIT_SECS: u64 = 120;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Block storage (Cinder v3) endpoint, including the project path
    #[serde(default)]
    pub block_storage_endpoint: Option<String>,
    /// Shared file system (Manila v2) endpoint, including the project path
    #[serde(default)]
    pub shared_file_system_endpoint: Option<String>,
    /// Pre-issued Keystone token
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub block_storage_microversion: Option<String>,
    #[serde(default)]
    pub shared_file_system_microversion: Option<String>,
    /// Seconds between status checks when waiting
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// Seconds to wait before giving up on a status change
    #[serde(default)]
    pub wait_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tstack").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                Self::default()
            },
        }
    }

    fn parse(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed config file: {}", e);
            Self::default()
        })
    }

    /// Apply `OS_*` environment overrides (env > config file)
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup("OS_AUTH_TOKEN") {
            self.auth_token = Some(token);
        }
        if let Some(endpoint) = lookup("OS_BLOCK_STORAGE_ENDPOINT") {
            self.block_storage_endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup("OS_SHARED_FILE_SYSTEM_ENDPOINT") {
            self.shared_file_system_endpoint = Some(endpoint);
        }
        self
    }

    /// Get effective poll interval
    pub fn effective_poll_interval(&self) -> u64 {
        self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
    }

    /// Get effective wait budget
    pub fn effective_wait(&self) -> u64 {
        self.wait_secs.unwrap_or(DEFAULT_WAIT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_config_falls_back_to_default() {
        let config = Config::parse("{not json");
        assert!(config.block_storage_endpoint.is_none());
        assert_eq!(config.effective_poll_interval(), DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.effective_wait(), DEFAULT_WAIT_SECS);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config::parse(
            r#"{"shared_file_system_endpoint": "https://file.example.com/v2/p", "wait_secs": 30}"#,
        )
        .with_overrides(|key| match key {
            "OS_SHARED_FILE_SYSTEM_ENDPOINT" => Some("https://manila.example.com/v2/p".to_string()),
            "OS_AUTH_TOKEN" => Some("tok".to_string()),
            _ => None,
        });

        assert_eq!(
            config.shared_file_system_endpoint.as_deref(),
            Some("https://manila.example.com/v2/p")
        );
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.effective_wait(), 30);
    }

    #[test]
    fn test_token_is_not_serialized() {
        let config = Config {
            auth_token: Some("secret".to_string()),
            ..Config::default()
        };
        let out = serde_json::to_string(&config).unwrap();
        assert!(!out.contains("secret"));
    }
}
