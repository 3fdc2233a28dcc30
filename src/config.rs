//! Configuration for the orders service.
//!
//! Supports YAML file and environment variable overrides. Any external
//! service without a URL is replaced by its in-process implementation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External HTTP services.
    pub services: ServicesConfig,
    /// Event queue.
    pub messaging: MessagingConfig,
    /// Catalog detail cache.
    pub cache: CacheConfig,
    /// Order assembly limits.
    pub assembly: AssemblyConfig,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: ServicesConfig::default(),
            messaging: MessagingConfig::default(),
            cache: CacheConfig::default(),
            assembly: AssemblyConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub catalog_url: Option<String>,
    pub users_url: Option<String>,
    pub solr_url: Option<String>,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout_ms: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            catalog_url: None,
            users_url: None,
            solr_url: None,
            http_timeout_ms: 5_000,
        }
    }
}

impl ServicesConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub amqp_url: Option<String>,
    pub queue: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            amqp_url: None,
            queue: "orders.index".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Unbounded when unset.
    pub max_parallel_items: Option<usize>,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (`ORDERS_CONFIG`, default `config.yaml`)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("ORDERS_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Empty values clear optional URLs;
    /// unparsable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let url = |key: &str| lookup(key).map(|v| Some(v.trim().to_string()).filter(|v| !v.is_empty()));

        if let Some(value) = url("CATALOG_URL") {
            self.services.catalog_url = value;
        }
        if let Some(value) = url("USERS_API_URL") {
            self.services.users_url = value;
        }
        if let Some(value) = url("SOLR_URL") {
            self.services.solr_url = value;
        }
        if let Some(value) = url("AMQP_URL") {
            self.messaging.amqp_url = value;
        }
        if let Some(queue) = lookup("ORDERS_QUEUE") {
            self.messaging.queue = queue;
        }
        if let Some(Ok(ms)) = lookup("HTTP_TIMEOUT_MS").map(|v| v.parse()) {
            self.services.http_timeout_ms = ms;
        }
        if let Some(Ok(secs)) = lookup("CACHE_TTL_SECS").map(|v| v.parse()) {
            self.cache.ttl_secs = secs;
        }
        if let Some(Ok(n)) = lookup("MAX_PARALLEL_ITEMS").map(|v| v.parse::<usize>()) {
            self.assembly.max_parallel_items = Some(n).filter(|n| *n > 0);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}
