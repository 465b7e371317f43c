//! SQLite-backed key/value store.
//!
//! Persists the timer keys in a single `kv` table at
//! `~/.config/focuskeeper/focuskeeper.db`. Each row also records which
//! engine instance wrote it and when.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::broadcast;

use super::{announce, change_feed, data_dir, PersistentStore, StoreChange};
use crate::error::{CoreError, StoreError};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    feed: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    /// Open the store at `~/.config/focuskeeper/focuskeeper.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focuskeeper.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(std::time::Duration::from_secs(2))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                origin     TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: change_feed(),
        })
    }
}

impl PersistentStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str, origin: &str) -> Result<(), StoreError> {
        {
            let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
            conn.execute(
                "INSERT OR REPLACE INTO kv (key, value, origin, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, value, origin, Utc::now().to_rfc3339()],
            )?;
        }
        announce(&self.feed, key, origin);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.feed.subscribe()
    }
}
