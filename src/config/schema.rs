//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::cache::CacheClientConfig;
use crate::resilience::CircuitBreakerConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Public HTTP listener.
    pub listener: ListenerConfig,

    /// Resilient cache client settings.
    pub cache: CacheConfig,

    /// Key-value store connection.
    pub store: StoreConfig,

    /// Product catalog caching.
    pub catalog: CatalogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Resilient cache client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Deadline for each store operation in milliseconds.
    pub timeout_ms: u64,

    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Time the circuit stays open before a trial call, in milliseconds.
    pub cooldown_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 200,
            failure_threshold: 3,
            cooldown_ms: 5000,
        }
    }
}

impl CacheConfig {
    pub fn client_config(&self) -> CacheClientConfig {
        CacheClientConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            breaker: CircuitBreakerConfig {
                failure_threshold: self.failure_threshold,
                cooldown: Duration::from_millis(self.cooldown_ms),
            },
        }
    }
}

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Key-value store connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: u32,
    /// Deadline for establishing the initial connection, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
            connect_timeout_secs: 5,
        }
    }
}

impl StoreConfig {
    /// Connection URL with percent-encoded credentials.
    pub fn redis_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("redis://{}:{}/{}", self.host, self.port, self.database))?;
        // The setters only fail for host-less URLs, which parse() rejects.
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            let _ = url.set_username(username);
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            let _ = url.set_password(Some(password));
        }
        Ok(url)
    }

    /// URL safe to log: credentials removed.
    pub fn redacted_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Product catalog caching.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// TTL for cached products and product pages, in seconds.
    pub product_ttl_secs: u64,

    /// Upper bound for the `limit` query parameter.
    pub max_page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            product_ttl_secs: 600,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
