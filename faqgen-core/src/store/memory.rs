//! In-process store with TTL support.
//!
//! Expiry uses `tokio::time::Instant`, so tests can drive it with a paused clock.

use super::KvStore;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A `HashMap`-backed store. Every operation holds the map lock for its
/// whole duration, which makes each one atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn live<'a>(map: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if map.get(key).is_some_and(|e| !e.is_live(now)) {
        map.remove(key);
    }
    map.get_mut(key)
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut map = self.entries.lock().await;
        Ok(live(&mut map, key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.entries.lock().await;
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut map = self.entries.lock().await;
        Ok(live(&mut map, key).is_some())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut map = self.entries.lock().await;
        match live(&mut map, key) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| StoreError::Corrupt {
                    key: key.to_string(),
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                map.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut map = self.entries.lock().await;
        if live(&mut map, key).is_some() {
            return Ok(false);
        }
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut map = self.entries.lock().await;
        match live(&mut map, key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_exists() {
        let store = MemoryStore::new();
        assert!(!store.exists("a").await.unwrap());
        assert!(store.get("a").await.unwrap().is_none());
        store.set("a", "1").await.unwrap();
        assert!(store.exists("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_incr_creates_and_counts() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("c").await.unwrap(), 1);
        assert_eq!(store.incr("c").await.unwrap(), 2);
        assert_eq!(store.get("c").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer() {
        let store = MemoryStore::new();
        store.set("c", "many").await.unwrap();
        assert!(matches!(
            store.incr("c").await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_respects_expiry() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        assert!(store.set_if_absent_with_expiry("w", "0", ttl).await.unwrap());
        assert!(!store.set_if_absent_with_expiry("w", "0", ttl).await.unwrap());
        assert_eq!(store.incr("w").await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.exists("w").await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!store.exists("w").await.unwrap());
        assert!(store.set_if_absent_with_expiry("w", "0", ttl).await.unwrap());
        assert_eq!(store.get("w").await.unwrap().as_deref(), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_preserves_expiry() {
        let store = MemoryStore::new();
        store
            .set_if_absent_with_expiry("w", "0", Duration::from_secs(10))
            .await
            .unwrap();
        store.incr("w").await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.get("w").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire() {
        let store = MemoryStore::new();
        assert!(!store.expire("x", Duration::from_secs(5)).await.unwrap());
        store.set("x", "v").await.unwrap();
        assert!(store.expire("x", Duration::from_secs(5)).await.unwrap());
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.is_empty().await);
    }
}
