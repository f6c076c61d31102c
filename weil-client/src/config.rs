use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use weil_types::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SENTINEL_URL, MAX_RETRIES,
    SENTINEL_HOST_ENV,
};

use crate::error::ClientError;

/// File written by [`ClientConfig::init`].
pub const CONFIG_FILE_NAME: &str = "weil.toml";

/// Client settings, usually read from `weil.toml`. Missing fields take
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the sentinel, without a trailing path.
    pub sentinel_url: String,
    /// Hex-encoded private key file.
    pub key_path: PathBuf,
    pub request_timeout_secs: u64,
    /// Submissions made while reconciling nonce conflicts.
    pub max_retries: u32,
    /// Maximum in-flight submissions per client.
    pub concurrency: usize,
    /// Skip TLS certificate verification. Only for sentinels with
    /// self-signed certificates.
    pub accept_invalid_certs: bool,
    pub log_level: String,
}

/// `~/.weilliptic/private_key.wc`, or a relative fallback when the home
/// directory is unknown.
pub fn default_key_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".weilliptic").join("private_key.wc"))
        .unwrap_or_else(|| PathBuf::from("private_key.wc"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sentinel_url: DEFAULT_SENTINEL_URL.to_string(),
            key_path: default_key_path(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            max_retries: MAX_RETRIES,
            concurrency: DEFAULT_CONCURRENCY,
            accept_invalid_certs: false,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ClientError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let config: ClientConfig = toml::from_str(&contents).map_err(|e| ClientError::Config {
            reason: format!("failed to parse config file '{}': {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default `weil.toml` into `dir`, returning its path.
    pub fn init(dir: impl AsRef<Path>) -> Result<PathBuf, ClientError> {
        let dir_path = dir.as_ref();
        if !dir_path.exists() {
            std::fs::create_dir_all(dir_path)?;
        }

        let config = ClientConfig::default();
        let toml_str = toml::to_string_pretty(&config).map_err(|e| ClientError::Config {
            reason: format!("failed to serialize default config: {}", e),
        })?;

        let config_path = dir_path.join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, toml_str)?;

        Ok(config_path)
    }

    /// Apply `SENTINEL_HOST` from the environment, if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var(SENTINEL_HOST_ENV) {
            self.apply_sentinel_host(&host);
        }
        self
    }

    /// Override the sentinel. A bare host gets an `https://` scheme.
    pub fn apply_sentinel_host(&mut self, host: &str) {
        let host = host.trim();
        if host.is_empty() {
            return;
        }
        self.sentinel_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.sentinel_url.trim().is_empty() {
            return Err(ClientError::Config {
                reason: "sentinel_url must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config {
                reason: "request_timeout_secs must be positive".to_string(),
            });
        }
        if self.max_retries == 0 {
            return Err(ClientError::Config {
                reason: "max_retries must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ClientError::Config {
                reason: "concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.sentinel_url, DEFAULT_SENTINEL_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.concurrency, 64);
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.log_level, "info");
        assert!(config.key_path.ends_with("private_key.wc"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: ClientConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: ClientConfig = toml::from_str(r#"max_retries = 5"#).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.sentinel_url, DEFAULT_SENTINEL_URL);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_init_creates_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = ClientConfig::init(tmp.path()).unwrap();
        assert_eq!(path, tmp.path().join(CONFIG_FILE_NAME));

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ClientConfig::load("/nonexistent/path/weil.toml");
        assert!(matches!(result, Err(ClientError::Config { .. })));
    }

    #[test]
    fn test_load_rejects_zero_retries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "max_retries = 0\n").unwrap();
        let err = ClientConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_sentinel_host_override() {
        let mut config = ClientConfig::default();
        config.apply_sentinel_host("sentinel.example.org");
        assert_eq!(config.sentinel_url, "https://sentinel.example.org");

        config.apply_sentinel_host("http://127.0.0.1:8080/");
        assert_eq!(config.sentinel_url, "http://127.0.0.1:8080");

        config.apply_sentinel_host("  ");
        assert_eq!(config.sentinel_url, "http://127.0.0.1:8080");
    }
}
