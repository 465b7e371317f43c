use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;

use super::{announce, change_feed, PersistentStore, StoreChange};
use crate::error::StoreError;

/// In-process store. Engines sharing one `Arc<MemoryStore>` behave like
/// browser tabs sharing one profile's storage.
#[derive(Debug)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    feed: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            feed: change_feed(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str, origin: &str) -> Result<(), StoreError> {
        {
            let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
            values.insert(key.to_string(), value.to_string());
        }
        announce(&self.feed, key, origin);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.feed.subscribe()
    }
}
