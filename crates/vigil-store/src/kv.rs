//! Whole-value key/value persistence.
//!
//! Values are read and written in full; there is no append or
//! compare-and-swap. Callers that read, modify and write back a value are
//! exposed to lost updates when two of them interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Current value for `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value for `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

impl Database {
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }
}

/// [`KeyValueStore`] backed by the `kv_store` table.
#[derive(Clone)]
pub struct SqliteKvStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteKvStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let guard = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&guard)
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_db(|db| db.kv_get(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_db(|db| db.kv_set(key, value))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.with_db(|db| db.kv_delete(key).map(|_| ()))
    }
}

/// Process-local [`KeyValueStore`]; nothing survives a restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_set_get_overwrite() {
        let kv = SqliteKvStore::new(Database::open_in_memory().unwrap());

        assert_eq!(kv.get("k").await.unwrap(), None);
        kv.set("k", "one").await.unwrap();
        kv.set("k", "two").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("two"));

        kv.delete("k").await.unwrap();
        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_value_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");

        {
            let kv = SqliteKvStore::new(Database::open_at(&path).unwrap());
            kv.set("queue", "[]").await.unwrap();
        }

        let kv = SqliteKvStore::new(Database::open_at(&path).unwrap());
        assert_eq!(kv.get("queue").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let kv = MemoryKvStore::new();
        kv.set("a", "1").await.unwrap();
        let clone = kv.clone();
        assert_eq!(clone.get("a").await.unwrap().as_deref(), Some("1"));
    }
}
