use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::explorer::retry::RetryConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.etherscan.io/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub api_key: Zeroizing<String>,
    pub requests_per_second: usize,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl fmt::Debug for ExplorerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplorerConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("requests_per_second", &self.requests_per_second)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ExplorerConfig {
    // Etherscan mainnet with the free-tier budget
    pub fn mainnet_default(api_key: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Zeroizing::new(api_key),
            requests_per_second: 5,
            cache_ttl: Duration::from_secs(30),
            cache_capacity: 1000,
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    pub fn load_from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("ETHERSCAN_API_KEY"))?;

        let mut config = Self::mainnet_default(api_key);
        if let Ok(base_url) = env::var("ETHERSCAN_BASE_URL") {
            config.base_url = base_url;
        }
        config.requests_per_second = env_or("RATE_LIMIT", config.requests_per_second)?;
        config.cache_ttl = Duration::from_secs(env_or("CACHE_TTL_SECS", config.cache_ttl.as_secs())?);
        config.cache_capacity = env_or("CACHE_CAPACITY", config.cache_capacity)?;
        config.request_timeout =
            Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", config.request_timeout.as_secs())?);
        config.retry.max_attempts = env_or("MAX_RETRIES", config.retry.max_attempts)?;

        if config.requests_per_second == 0 {
            return Err(ConfigError::Invalid {
                name: "RATE_LIMIT",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }

    // Per-call timeout lives on the client so every request gets it
    pub fn create_http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(concat!("eth_whale_intel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }
}

/// Reads `name` from the environment, falling back to `default` when unset.
pub(crate) fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
