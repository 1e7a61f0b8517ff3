// 🗄️ Key-Value Storage - the persistence seam under the shipment store
//
// The store keeps the whole collection as ONE serialized value under ONE key.
// Backends only need get/set of strings; lifecycle is explicit (open/close).

use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// STORAGE TRAIT
// ============================================================================

pub trait KeyValueStorage {
    /// Read a value; `None` when the key was never written
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Overwrite the value for a key
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Release the backend. Dropping also releases it, but close reports errors.
    fn close(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

// ============================================================================
// SQLITE BACKEND
// ============================================================================

/// Durable storage: one row per key in `kv_store`
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) a database file, creating parent directories
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite storage");

        Ok(SqliteStorage { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStorage { conn })
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        self.conn
            .close()
            .map_err(|(_, err)| StoreError::from(err))
    }
}

pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    // WAL for crash recovery; in-memory databases answer "memory"
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::trace!(journal_mode = %mode, "journal mode set");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// Volatile storage for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key (e.g. to simulate a corrupt blob)
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_get_set_overwrite() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();

        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "[1]").unwrap();
        storage.set("k", "[1,2]").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("[1,2]"));

        let rows: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1, "set must overwrite, not append");

        storage.close().unwrap();
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shipments.db");

        let mut storage = SqliteStorage::open(&path).unwrap();
        storage.set("dispatch", "[]").unwrap();
        storage.close().unwrap();

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.get("dispatch").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new().with_entry("a", "1");
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get("b").unwrap(), None);

        storage.set("b", "2").unwrap();
        assert_eq!(storage.get("b").unwrap().as_deref(), Some("2"));
    }
}
