//! Persistent storage adapter
//!
//! The session is mirrored into two key-value stores: a short-lived store that
//! does not survive the client going away, and a durable store that is only
//! read once to migrate credentials written by older clients.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::StorageConfig;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of each store's change-event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Fixed keys the session is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AuthToken,
    UserData,
    TokenExpiry,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [
        StorageKey::AuthToken,
        StorageKey::UserData,
        StorageKey::TokenExpiry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::AuthToken => "authToken",
            StorageKey::UserData => "userData",
            StorageKey::TokenExpiry => "tokenExpiry",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two stores to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    /// Short-lived, authoritative
    Session,
    /// Durable, migration source only
    Durable,
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageArea::Session => write!(f, "session"),
            StorageArea::Durable => write!(f, "durable"),
        }
    }
}

/// A change observed on a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// True when this event is the removal of `key`
    pub fn is_removal_of(&self, key: StorageKey) -> bool {
        self.key == key.as_str() && self.new_value.is_none()
    }
}

/// A string key-value store shared by every holder of the same `Arc`
///
/// Implementations publish a [`StorageEvent`] for every write that actually
/// changes a value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Subscribe to changes made through any handle on this store
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;

    /// Pick up changes made outside this process. Stores with no external
    /// writers have nothing to do.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn event_channel() -> broadcast::Sender<StorageEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Both stores, addressed by [`StorageArea`] and [`StorageKey`]
#[derive(Clone)]
pub struct Storage {
    session: Arc<dyn KeyValueStore>,
    durable: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(session: Arc<dyn KeyValueStore>, durable: Arc<dyn KeyValueStore>) -> Self {
        Self { session, durable }
    }

    /// Two fresh in-memory stores
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// File-backed stores at the configured paths
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let session = FileStore::open(&config.session_path)?;
        let durable = FileStore::open(&config.durable_path)?;
        Ok(Self::new(Arc::new(session), Arc::new(durable)))
    }

    pub fn area(&self, area: StorageArea) -> &Arc<dyn KeyValueStore> {
        match area {
            StorageArea::Session => &self.session,
            StorageArea::Durable => &self.durable,
        }
    }

    pub fn get(&self, area: StorageArea, key: StorageKey) -> Result<Option<String>> {
        self.area(area).get(key.as_str())
    }

    pub fn set(&self, area: StorageArea, key: StorageKey, value: &str) -> Result<()> {
        self.area(area).set(key.as_str(), value)
    }

    pub fn remove(&self, area: StorageArea, key: StorageKey) -> Result<()> {
        self.area(area).remove(key.as_str())
    }

    /// Remove every session key from one store. Every key is attempted; the
    /// first failure is returned.
    pub fn clear(&self, area: StorageArea) -> Result<()> {
        let mut first_error = None;
        for key in StorageKey::ALL {
            if let Err(e) = self.remove(area, key) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn subscribe(&self, area: StorageArea) -> broadcast::Receiver<StorageEvent> {
        self.area(area).subscribe()
    }

    pub fn refresh(&self, area: StorageArea) -> Result<()> {
        self.area(area).refresh()
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
