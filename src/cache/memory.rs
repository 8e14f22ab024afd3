//! In-process connector backed by a concurrent map.
//!
//! Used for local development (`store.backend = "memory"`) and tests. Keys
//! expire lazily on access.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::connector::Connector;
use crate::cache::error::ConnectorError;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live_value(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        None
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ConnectorError> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<(), ConnectorError> {
        let expires_at = ttl_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), ConnectorError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ConnectorError> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|r| r.value().is_live(now) && glob_match(pattern, r.key()))
            .map(|r| r.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, ConnectorError> {
        Ok(self.live_value(key).is_some())
    }

    async fn flush_all(&self) -> Result<(), ConnectorError> {
        self.entries.clear();
        Ok(())
    }

    async fn info(&self) -> Result<String, ConnectorError> {
        Ok(format!("# Memory\r\nbackend:memory\r\nkeys:{}\r\n", self.entries.len()))
    }
}

/// Glob matching with Redis `KEYS` semantics for `*` and `?`.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();
    let (mut pi, mut ki) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ki));
            pi += 1;
        } else if let Some((sp, sk)) = star {
            // Backtrack: let the last star swallow one more char.
            pi = sp + 1;
            ki = sk + 1;
            star = Some((sp, sk + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "cart:1"));
        assert!(glob_match("cart:*", "cart:12"));
        assert!(glob_match("cart:?", "cart:1"));
        assert!(!glob_match("cart:?", "cart:12"));
        assert!(glob_match("*:list", "carts:list"));
        assert!(glob_match("c*t:*", "cart:9"));
        assert!(!glob_match("product:*", "cart:1"));
        assert!(glob_match("", ""));
        assert!(!glob_match("", "a"));
    }

    #[tokio::test]
    async fn test_set_get_del() {
        let store = MemoryConnector::new();
        store.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(store.exists("k").await.unwrap());

        store.del("k").await.unwrap();
        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let store = MemoryConnector::new();
        store.set("short", b"1".to_vec(), Some(10)).await.unwrap();
        store.set("forever", b"2".to_vec(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(!store.exists("short").await.unwrap());
        assert_eq!(store.keys("*").await.unwrap(), vec!["forever".to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_and_flush() {
        let store = MemoryConnector::new();
        for key in ["cart:2", "cart:1", "product:1"] {
            store.set(key, Vec::new(), None).await.unwrap();
        }
        assert_eq!(store.keys("cart:*").await.unwrap(), vec!["cart:1", "cart:2"]);

        store.flush_all().await.unwrap();
        assert!(store.is_empty());
        assert!(store.info().await.unwrap().contains("keys:0"));
    }
}
