//! Store connector contract.
//!
//! A connector owns the connection to the key-value store and exposes raw,
//! unprotected operations on byte values. Timeouts and breaker logic live in
//! the client that wraps it.

use async_trait::async_trait;

use crate::cache::error::ConnectorError;

#[async_trait]
pub trait Connector: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ConnectorError>;

    /// Store `value`. `ttl_secs` of `None` stores without expiration.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<(), ConnectorError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn del(&self, key: &str) -> Result<(), ConnectorError>;

    /// Keys matching a glob-style pattern (`*`, `?`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ConnectorError>;

    async fn exists(&self, key: &str) -> Result<bool, ConnectorError>;

    async fn flush_all(&self) -> Result<(), ConnectorError>;

    /// Free-form diagnostic text about the store.
    async fn info(&self) -> Result<String, ConnectorError>;
}
