//! In-memory key-value store

use super::{event_channel, KeyValueStore, StorageEvent};
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Process-local store. Share it through an `Arc` to give several session
/// contexts the same backing store.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            events: event_channel(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn publish(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        if old_value == new_value {
            return;
        }
        // No subscribers is fine
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            old_value,
            new_value,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let old = self
            .entries
            .write()
            .insert(key.to_string(), value.to_string());
        self.publish(key, old, Some(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let old = self.entries.write().remove(key);
        self.publish(key, old, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
