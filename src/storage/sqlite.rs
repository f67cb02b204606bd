use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{error, info};

use super::KeyValueStore;
use crate::error::StoreError;

/// SQLite-backed key-value store with a single `kv` table.
///
/// rusqlite is blocking; callers in async contexts should use
/// `tokio::task::spawn_blocking` for bulk work.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database, creating the parent directory if needed.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("Failed to create data dir: {}", e)))?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            StoreError::Backend(format!("Failed to open store at {:?}: {}", db_path, e))
        })?;
        Self::init(conn, &format!("{:?}", db_path))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Backend(format!("Failed to open in-memory store: {}", e)))?;
        Self::init(conn, "memory")
    }

    fn init(conn: Connection, label: &str) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .map_err(|e| StoreError::Backend(format!("Failed to create kv table: {}", e)))?;

        info!("Opened key-value store at {}", label);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// `<data dir>/pixshop/pixshop.db`, or `None` when the platform has no data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("pixshop").join("pixshop.db"))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let result = conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        });

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => {
                error!("Store lookup for '{}' failed: {}", key, e);
                Err(StoreError::Backend(format!("Lookup failed: {}", e)))
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(|e| {
            error!("Store write for '{}' failed: {}", key, e);
            StoreError::Backend(format!("Write failed: {}", e))
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| StoreError::Backend(format!("Delete failed: {}", e)))?;
        Ok(())
    }
}
