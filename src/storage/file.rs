//! JSON-file backed key-value store

use super::{event_channel, KeyValueStore, StorageEvent};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Store persisted as a flat JSON object of string values.
///
/// Reads are served from an in-memory copy; every write rewrites the file.
/// `refresh` re-reads the file and publishes events for changes made by other
/// processes.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = read_entries(&path)?;
        debug!("Opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            events: event_channel(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to disk. The file and any directories created for it
    /// are readable by the owner only.
    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_private_dir(parent)?;
            }
        }
        let sorted: BTreeMap<_, _> = entries.iter().collect();
        let content = serde_json::to_string_pretty(&sorted)?;

        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, content.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn publish(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        if old_value == new_value {
            return;
        }
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            old_value,
            new_value,
        });
    }
}

/// Read the file into a map. A missing file is an empty store; an unreadable
/// or malformed one is discarded with a warning.
fn read_entries(path: &Path) -> Result<HashMap<String, String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }

    match serde_json::from_str(&content) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!("Discarding malformed store file {}: {}", path.display(), e);
            Ok(HashMap::new())
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // A leftover temp file keeps its old mode
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let old = {
            let mut entries = self.entries.write();
            let old = entries.get(key).cloned();
            if old.as_deref() != Some(value) {
                let mut next = entries.clone();
                next.insert(key.to_string(), value.to_string());
                self.persist(&next)?;
                *entries = next;
            }
            old
        };
        self.publish(key, old, Some(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let old = {
            let mut entries = self.entries.write();
            let old = entries.get(key).cloned();
            if old.is_some() {
                let mut next = entries.clone();
                next.remove(key);
                self.persist(&next)?;
                *entries = next;
            }
            old
        };
        self.publish(key, old, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    fn refresh(&self) -> Result<()> {
        let latest = read_entries(&self.path)?;
        let previous = std::mem::replace(&mut *self.entries.write(), latest.clone());

        for (key, old) in &previous {
            if !latest.contains_key(key) {
                self.publish(key, Some(old.clone()), None);
            }
        }
        for (key, new) in latest {
            let old = previous.get(&key).cloned();
            self.publish(&key, old, Some(new));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.set("authToken", "token-value-123").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("authToken").unwrap(),
            Some("token-value-123".to_string())
        );
    }

    #[test]
    fn test_malformed_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("authToken").unwrap(), None);
    }

    #[test]
    fn test_failed_write_leaves_cache_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.set("userData", "{}").unwrap();
        let mut rx = store.subscribe();

        // A directory in place of the file makes the final rename fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.set("authToken", "tok-0123456789").is_err());
        assert_eq!(store.get("authToken").unwrap(), None);
        assert!(store.remove("userData").is_err());
        assert_eq!(store.get("userData").unwrap(), Some("{}".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("admin-session");
        let path = parent.join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.set("authToken", "token-value-123").unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), 0o600);
        assert_eq!(mode(&parent), 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_leftover_temp_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, "stale").unwrap();
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::open(&path).unwrap();
        store.set("authToken", "token-value-123").unwrap();

        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_refresh_reports_external_removal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let ours = FileStore::open(&path).unwrap();
        ours.set("authToken", "token-value-123").unwrap();
        let mut rx = ours.subscribe();

        // Another process logs out
        let theirs = FileStore::open(&path).unwrap();
        theirs.remove("authToken").unwrap();

        ours.refresh().unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.key, "authToken");
        assert_eq!(event.old_value, Some("token-value-123".to_string()));
        assert_eq!(event.new_value, None);
        assert_eq!(ours.get("authToken").unwrap(), None);
    }
}
