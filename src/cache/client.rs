//! Resilient cache client.
//!
//! Every operation runs through one evaluation path:
//! ```text
//! breaker.acquire()        (fail fast: CircuitOpen / TrialInProgress)
//!     → with_timeout()     (Timeout / Downstream)
//!     → permit.succeed() | permit.fail()
//!     → observers
//! ```
//! `flush_all` and `info` are administrative: they keep the deadline but skip
//! breaker admission and accounting.
//!
//! Two API flavours share that path. The strict `try_*` methods return
//! `CacheResult`. The plain methods absorb every error: reads degrade to a
//! miss (`None`, `false`, empty list) and writes are best-effort.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::codec::{Codec, JsonCodec};
use crate::cache::connector::Connector;
use crate::cache::error::{CacheError, CacheResult, ConnectorError, Operation};
use crate::cache::observer::{CacheEvent, CacheObserver, MetricsObserver, Outcome, TracingObserver};
use crate::resilience::{with_timeout, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState, Rejection};

/// Client tuning.
#[derive(Debug, Clone)]
pub struct CacheClientConfig {
    /// Deadline for every downstream call.
    pub timeout: Duration,
    pub breaker: CircuitBreakerConfig,
}

impl Default for CacheClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(200),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Cache client using the default JSON codec.
pub type CacheClient = ResilientCacheClient<JsonCodec>;

/// Timeout- and breaker-protected wrapper around a store connector.
pub struct ResilientCacheClient<C: Codec = JsonCodec> {
    connector: Arc<dyn Connector>,
    breaker: CircuitBreaker,
    timeout: Duration,
    codec: C,
    observers: Vec<Arc<dyn CacheObserver>>,
}

impl ResilientCacheClient<JsonCodec> {
    pub fn new(connector: Arc<dyn Connector>, config: CacheClientConfig) -> Self {
        Self::with_codec(connector, config, JsonCodec)
    }
}

impl<C: Codec> ResilientCacheClient<C> {
    /// Create a client with a custom codec. The tracing and metrics
    /// observers are installed by default.
    pub fn with_codec(connector: Arc<dyn Connector>, config: CacheClientConfig, codec: C) -> Self {
        let breaker = CircuitBreaker::new(connector.name(), config.breaker);
        Self {
            connector,
            breaker,
            timeout: config.timeout,
            codec,
            observers: vec![Arc::new(TracingObserver), Arc::new(MetricsObserver)],
        }
    }

    /// Drop the built-in tracing and metrics observers. Observers added
    /// afterwards with [`with_observer`](Self::with_observer) are the only
    /// ones notified.
    pub fn without_default_observers(mut self) -> Self {
        self.observers.clear();
        self
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Add an observer that receives every operation event.
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn backend(&self) -> &'static str {
        self.connector.name()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    // --- Absorbing API ---

    /// Typed read. Any failure, including an undecodable value, is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_get(key).await.ok().flatten()
    }

    pub async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.try_get_raw(key).await.ok().flatten()
    }

    /// Best-effort write. `ttl_secs == 0` stores without expiration.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_secs: u64) {
        let _ = self.try_set(key, value, ttl_secs).await;
    }

    pub async fn set_raw(&self, key: &str, value: Vec<u8>, ttl_secs: u64) {
        let _ = self.try_set_raw(key, value, ttl_secs).await;
    }

    /// Best-effort delete.
    pub async fn del(&self, key: &str) {
        let _ = self.try_del(key).await;
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.try_exists(key).await.unwrap_or(false)
    }

    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        self.try_keys(pattern).await.unwrap_or_default()
    }

    pub async fn flush_all(&self) {
        let _ = self.try_flush_all().await;
    }

    pub async fn info(&self) -> Option<String> {
        self.try_info().await.ok()
    }

    // --- Strict API ---

    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let started = Instant::now();
        let result = match self.guarded(Operation::Get, || self.connector.get(key)).await {
            Ok(Some(bytes)) => self
                .codec
                .decode(&bytes)
                .map(Some)
                .map_err(|source| CacheError::Codec {
                    operation: Operation::Get,
                    key: key.to_string(),
                    source,
                }),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        self.finish(Operation::Get, Some(key), started, result, read_outcome)
    }

    pub async fn try_get_raw(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let started = Instant::now();
        let result = self.guarded(Operation::Get, || self.connector.get(key)).await;
        self.finish(Operation::Get, Some(key), started, result, read_outcome)
    }

    pub async fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_secs: u64) -> CacheResult<()> {
        let started = Instant::now();
        match self.codec.encode(value) {
            Ok(bytes) => self.store(key, bytes, ttl_secs, started).await,
            Err(source) => {
                let err = CacheError::Codec {
                    operation: Operation::Set,
                    key: key.to_string(),
                    source,
                };
                self.finish(Operation::Set, Some(key), started, Err(err), ok_outcome)
            }
        }
    }

    pub async fn try_set_raw(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> CacheResult<()> {
        self.store(key, value, ttl_secs, Instant::now()).await
    }

    pub async fn try_del(&self, key: &str) -> CacheResult<()> {
        let started = Instant::now();
        let result = self.guarded(Operation::Del, || self.connector.del(key)).await;
        self.finish(Operation::Del, Some(key), started, result, ok_outcome)
    }

    pub async fn try_exists(&self, key: &str) -> CacheResult<bool> {
        let started = Instant::now();
        let result = self.guarded(Operation::Exists, || self.connector.exists(key)).await;
        self.finish(Operation::Exists, Some(key), started, result, ok_outcome)
    }

    pub async fn try_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let started = Instant::now();
        let result = self.guarded(Operation::Keys, || self.connector.keys(pattern)).await;
        self.finish(Operation::Keys, Some(pattern), started, result, ok_outcome)
    }

    pub async fn try_flush_all(&self) -> CacheResult<()> {
        let started = Instant::now();
        let result = self.guarded(Operation::FlushAll, || self.connector.flush_all()).await;
        if result.is_ok() {
            tracing::info!(backend = self.backend(), "Cache flushed");
        }
        self.finish(Operation::FlushAll, None, started, result, ok_outcome)
    }

    pub async fn try_info(&self) -> CacheResult<String> {
        let started = Instant::now();
        let result = self.guarded(Operation::Info, || self.connector.info()).await;
        self.finish(Operation::Info, None, started, result, ok_outcome)
    }

    async fn store(&self, key: &str, value: Vec<u8>, ttl_secs: u64, started: Instant) -> CacheResult<()> {
        let ttl = (ttl_secs > 0).then_some(ttl_secs);
        let result = self
            .guarded(Operation::Set, || self.connector.set(key, value, ttl))
            .await;
        self.finish(Operation::Set, Some(key), started, result, ok_outcome)
    }

    /// Breaker admission, deadline, and outcome accounting for one call.
    async fn guarded<T, F, Fut>(&self, operation: Operation, call: F) -> CacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        if operation.is_administrative() {
            return with_timeout(operation, self.timeout, call()).await;
        }

        let permit = self.breaker.acquire().map_err(|rejection| match rejection {
            Rejection::Open { retry_in } => CacheError::CircuitOpen { operation, retry_in },
            Rejection::TrialInProgress => CacheError::TrialInProgress { operation },
        })?;

        let result = with_timeout(operation, self.timeout, call()).await;
        match &result {
            Ok(_) => permit.succeed(),
            Err(_) => permit.fail(),
        }
        result
    }

    fn finish<T>(
        &self,
        operation: Operation,
        key: Option<&str>,
        started: Instant,
        result: CacheResult<T>,
        outcome_of: fn(&T) -> Outcome,
    ) -> CacheResult<T> {
        let (outcome, error) = match &result {
            Ok(value) => (outcome_of(value), None),
            Err(e) => (Outcome::from(e), Some(e)),
        };
        let event = CacheEvent {
            operation,
            key,
            outcome,
            latency: started.elapsed(),
            state: self.breaker.state(),
            error,
        };
        for observer in &self.observers {
            observer.observe(&event);
        }
        result
    }
}

fn read_outcome<T>(value: &Option<T>) -> Outcome {
    if value.is_some() {
        Outcome::Hit
    } else {
        Outcome::Miss
    }
}

fn ok_outcome<T>(_: &T) -> Outcome {
    Outcome::Ok
}

impl<C: Codec> fmt::Debug for ResilientCacheClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientCacheClient")
            .field("backend", &self.connector.name())
            .field("timeout_ms", &self.timeout.as_millis())
            .field("breaker", &self.breaker)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryConnector;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(Operation, Option<String>, Outcome)>>,
    }

    impl CacheObserver for Recorder {
        fn observe(&self, event: &CacheEvent<'_>) {
            self.events
                .lock()
                .unwrap()
                .push((event.operation, event.key.map(String::from), event.outcome));
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
        qty: u32,
    }

    fn client() -> (CacheClient, Arc<Recorder>, MemoryConnector) {
        let store = MemoryConnector::new();
        let recorder = Arc::new(Recorder::default());
        let client = CacheClient::new(Arc::new(store.clone()), CacheClientConfig::default())
            .with_observer(recorder.clone());
        (client, recorder, store)
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let (client, _, _) = client();
        let item = Item { name: "Camisa".into(), qty: 2 };

        client.set("item:1", &item, 0).await;
        assert_eq!(client.get::<Item>("item:1").await, Some(item));
        assert!(client.exists("item:1").await);
        assert_eq!(client.keys("item:*").await, vec!["item:1".to_string()]);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss_not_a_breaker_failure() {
        let (client, recorder, _) = client();
        client.set_raw("bad", b"{not json".to_vec(), 0).await;

        for _ in 0..5 {
            assert_eq!(client.get::<Item>("bad").await, None);
        }
        assert_eq!(client.state(), CircuitState::Closed);
        assert_eq!(client.snapshot().consecutive_failures, 0);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.last().unwrap().2, Outcome::CodecError);
    }

    #[tokio::test]
    async fn test_events_carry_operation_key_and_outcome() {
        let (client, recorder, _) = client();
        client.get_raw("missing").await;
        client.set("k", "v", 30).await;
        client.get::<String>("k").await;
        client.del("k").await;

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                (Operation::Get, Some("missing".into()), Outcome::Miss),
                (Operation::Set, Some("k".into()), Outcome::Ok),
                (Operation::Get, Some("k".into()), Outcome::Hit),
                (Operation::Del, Some("k".into()), Outcome::Ok),
            ]
        );
    }

    #[tokio::test]
    async fn test_default_observers_can_be_replaced() {
        let recorder = Arc::new(Recorder::default());
        let client = CacheClient::new(Arc::new(MemoryConnector::new()), CacheClientConfig::default());
        assert_eq!(client.observer_count(), 2);

        let client = client.without_default_observers().with_observer(recorder.clone());
        assert_eq!(client.observer_count(), 1);

        client.exists("k").await;
        assert_eq!(
            recorder.events.lock().unwrap().clone(),
            vec![(Operation::Exists, Some("k".into()), Outcome::Ok)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_zero_means_no_expiry() {
        let (client, _, _) = client();
        client.set("persistent", &1u32, 0).await;
        client.set("volatile", &2u32, 5).await;

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(client.get::<u32>("persistent").await, Some(1));
        assert_eq!(client.get::<u32>("volatile").await, None);
    }

    #[tokio::test]
    async fn test_flush_and_info() {
        let (client, _, store) = client();
        client.set("a", &1u8, 0).await;
        assert!(client.info().await.unwrap().contains("keys:1"));

        client.try_flush_all().await.unwrap();
        assert!(store.is_empty());
    }
}
