//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL, request timeout, and last used email.
//!
//! Configuration is stored at `~/.config/applyportal/config.json`. The
//! `APPLYPORTAL_API_URL` and `APPLYPORTAL_TIMEOUT_SECS` environment variables
//! override the file when set.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "applyportal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment override for the API base URL
pub const ENV_API_URL: &str = "APPLYPORTAL_API_URL";

/// Environment override for the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "APPLYPORTAL_TIMEOUT_SECS";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
    /// Encrypt persisted credentials and section data at rest
    pub encrypt_storage: bool,
    /// Route front ends send the user to when the session cannot be recovered
    pub login_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
            encrypt_storage: true,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_TIMEOUT_SECS).ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, timeout: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(raw) = timeout {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }
    }

    /// Base URL without a trailing slash, ready for `format!("{}{}", base, path)`
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding persisted credentials and section snapshots
    pub fn data_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.encrypt_storage);
        assert_eq!(config.login_path, "/login");
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = Config {
            api_base_url: "https://portal.example.org/api/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.base_url(), "https://portal.example.org/api");
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(
            Some("https://staging.example.org".to_string()),
            Some("5".to_string()),
        );
        assert_eq!(config.api_base_url, "https://staging.example.org");
        assert_eq!(config.request_timeout_secs, 5);

        config.apply_overrides(Some("  ".to_string()), Some("soon".to_string()));
        assert_eq!(config.api_base_url, "https://staging.example.org");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"last_email": "a@b.org"}"#)
            .expect("partial config should parse");
        assert_eq!(config.last_email.as_deref(), Some("a@b.org"));
        assert_eq!(config.request_timeout_secs, 30);
    }
}
