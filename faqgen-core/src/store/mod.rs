//! # Key-value store
//!
//! The cache and the rate limiter keep all of their state in a string-keyed
//! store that offers single-key atomic primitives. Two backends are provided:
//! an in-process [`MemoryStore`] and a durable [`SqliteStore`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Atomic single-key operations on string values.
///
/// Keys whose expiry has elapsed behave exactly as if they were absent.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a live value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value unconditionally, clearing any expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Whether a live value exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Increment an integer value and return the new value.
    ///
    /// A missing key counts as `0` and is created without expiry. An existing
    /// expiry is preserved.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Create `key` with `value` and an expiry of `ttl` only if no live value
    /// exists. Returns `true` when this call created the key.
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Set the expiry of a live key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
}

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn KvStore>;

/// Open the backend named in configuration.
pub fn open_store(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => {
            let path = config.resolved_path();
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
    }
}
