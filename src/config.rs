use std::time::Duration;

use config::{Config as ConfigLib, ConfigError, Environment};
use secrecy::SecretString;
use serde::Deserialize;

use crate::subscription::ValidateLiterals;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub soap: SoapConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoapConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Shared secret sent as the last argument of every operation
    pub key: SecretString,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub validate_operation: String,
    #[serde(default)]
    pub validate_literals: ValidateLiterals,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of an authorization decision, in seconds
    pub ttl: u64,
    pub max_capacity: u64,
    /// Remote checks a single listing may run at once
    pub max_concurrency: usize,
}

impl SoapConfig {
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // Build the config
        let config = ConfigLib::builder()
            // Set default values
            .set_default("server.host", "localhost")?
            .set_default("server.port", 8000)?
            .set_default("soap.host", "localhost")?
            .set_default("soap.port", 8001)?
            .set_default("soap.path", "/api/subscribe")?
            .set_default("soap.key", "")?
            .set_default("soap.timeout_ms", 3000)?
            .set_default("soap.max_retries", 2)?
            .set_default("soap.retry_backoff_ms", 200)?
            .set_default("soap.validate_operation", "checkSubscribe")?
            .set_default("cache.ttl", 5)?
            .set_default("cache.max_capacity", 1000)?
            .set_default("cache.max_concurrency", 16)?
            // Override config values via environment variables
            // The environment variables should be prefixed with 'APP_' and use '__' as a separator
            // Example: APP_SOAP__KEY=changeme
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }
}
