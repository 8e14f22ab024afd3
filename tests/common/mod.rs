//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cart_cache::cache::{
    CacheClient, CacheClientConfig, Connector, ConnectorError, MemoryConnector,
};
use cart_cache::resilience::CircuitBreakerConfig;

/// How the scripted connector answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Delegate to an in-memory store.
    Healthy,
    /// Fail immediately.
    Fail,
    /// Never answer.
    Hang,
}

/// Connector whose behavior is switched at runtime. Counts every call that
/// reaches it.
pub struct ScriptedConnector {
    mode: Mutex<Mode>,
    calls: AtomicUsize,
    store: MemoryConnector,
}

impl ScriptedConnector {
    pub fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
            store: MemoryConnector::new(),
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        match mode {
            Mode::Healthy => Ok(()),
            Mode::Fail => Err(ConnectorError::Unavailable("scripted failure".to_string())),
            Mode::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ConnectorError> {
        self.enter().await?;
        self.store.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<(), ConnectorError> {
        self.enter().await?;
        self.store.set(key, value, ttl_secs).await
    }

    async fn del(&self, key: &str) -> Result<(), ConnectorError> {
        self.enter().await?;
        self.store.del(key).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ConnectorError> {
        self.enter().await?;
        self.store.keys(pattern).await
    }

    async fn exists(&self, key: &str) -> Result<bool, ConnectorError> {
        self.enter().await?;
        self.store.exists(key).await
    }

    async fn flush_all(&self) -> Result<(), ConnectorError> {
        self.enter().await?;
        self.store.flush_all().await
    }

    async fn info(&self) -> Result<String, ConnectorError> {
        self.enter().await?;
        self.store.info().await
    }
}

/// 200ms timeout, threshold 3, 5s cooldown.
pub fn default_config() -> CacheClientConfig {
    CacheClientConfig {
        timeout: Duration::from_millis(200),
        breaker: CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown: Duration::from_secs(5),
        },
    }
}

pub fn client(connector: Arc<ScriptedConnector>) -> Arc<CacheClient> {
    Arc::new(CacheClient::new(connector, default_config()))
}
