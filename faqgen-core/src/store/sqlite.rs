//! Durable store backed by a single SQLite table.
//!
//! Expiry is kept as an absolute wall-clock timestamp in milliseconds and is
//! evaluated on every access; expired rows are removed lazily.

use super::KvStore;
use crate::error::StoreError;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    expires_at INTEGER
)";

/// SQLite-backed [`KvStore`].
///
/// The connection sits behind a mutex and every operation runs on the
/// blocking thread pool inside a transaction, so each operation is atomic.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
                message: format!("Cannot create store directory {}: {e}", parent.display()),
            })?;
        }
        debug!(path = %path.display(), "Opening SQLite store");
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Backend {
                message: "SQLite connection lock poisoned".to_string(),
            })?;
            op(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("SQLite task failed: {e}"),
        })?
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn expiry_ms(ttl: Duration) -> i64 {
    now_ms().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

fn purge_expired(conn: &Connection, key: &str) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM kv WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
        params![key, now_ms()],
    )?;
    Ok(())
}

fn read_live(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let value = conn
        .query_row(
            "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
            params![key, now_ms()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| read_live(conn, &key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, NULL)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = NULL",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| Ok(read_live(conn, &key)?.is_some()))
            .await
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            purge_expired(&tx, &key)?;
            let next = match read_live(&tx, &key)? {
                Some(current) => {
                    let current: i64 = current
                        .parse()
                        .map_err(|_| StoreError::Corrupt { key: key.clone() })?;
                    let next = current + 1;
                    tx.execute(
                        "UPDATE kv SET value = ?2 WHERE key = ?1",
                        params![key, next.to_string()],
                    )?;
                    next
                }
                None => {
                    tx.execute(
                        "INSERT INTO kv (key, value, expires_at) VALUES (?1, '1', NULL)",
                        params![key],
                    )?;
                    1
                }
            };
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            purge_expired(&tx, &key)?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expiry_ms(ttl)],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE kv SET expires_at = ?2
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?3)",
                params![key, expiry_ms(ttl), now_ms()],
            )?;
            Ok(updated > 0)
        })
        .await
    }
}
