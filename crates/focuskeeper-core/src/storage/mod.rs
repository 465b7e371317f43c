//! Durable key/value storage for the timer state.
//!
//! The engine only sees [`PersistentStore`]: independent string keys, each
//! holding one JSON-encoded value, plus a change feed that lets other engine
//! instances sharing the store notice writes they did not make.

mod config;
mod memory;
mod sqlite;

pub use config::{BackendConfig, Config, LoggingConfig, TimerConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{ConfigError, StoreError};

/// Capacity of the change feed. A subscriber that falls further behind
/// than this sees a lag error and should resync from the store.
pub(crate) const CHANGE_FEED_CAPACITY: usize = 256;

/// One write to the store, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChange {
    pub key: String,
    /// Identifier of the engine instance that made the write.
    pub origin: String,
}

pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key` and announce the change to subscribers.
    fn set(&self, key: &str, value: &str, origin: &str) -> Result<(), StoreError>;

    /// Receive every subsequent write, including this process's own.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Returns `~/.config/focuskeeper[-dev]/`, or `$FOCUSKEEPER_HOME` when set.
///
/// Set FOCUSKEEPER_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSKEEPER_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("FOCUSKEEPER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focuskeeper-dev")
            } else {
                base_dir.join("focuskeeper")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

pub(crate) fn change_feed() -> broadcast::Sender<StoreChange> {
    broadcast::channel(CHANGE_FEED_CAPACITY).0
}

pub(crate) fn announce(feed: &broadcast::Sender<StoreChange>, key: &str, origin: &str) {
    // No receivers is fine: nobody else is watching.
    let _ = feed.send(StoreChange {
        key: key.to_string(),
        origin: origin.to_string(),
    });
}
