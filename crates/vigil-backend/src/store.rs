//! Small persistent key-value store for client state that must survive a
//! restart, such as the monitoring flag and the alert volume.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keys written by the backend.
pub mod keys {
    pub const MONITORING: &str = "monitoring";
    pub const SOCKET_STATE: &str = "socketState";
    pub const ALERT_VOLUME: &str = "alertVolume";
    pub const USER_ID: &str = "userId";
}

/// User id reported when none was stored.
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("stored value for {key} is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Reads `key` decoded as `T`. A missing key is `Ok(None)`.
pub fn read<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(value) = store.get(key) else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
}

pub fn write<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(StoreError::Encode)?;
    store.set(key, value)
}

/// The stored user id, or [`ANONYMOUS_USER`].
pub fn user_id(store: &dyn KeyValueStore) -> String {
    match read::<String>(store, keys::USER_ID) {
        Ok(Some(id)) if !id.is_empty() => id,
        Ok(_) => ANONYMOUS_USER.to_string(),
        Err(error) => {
            log::warn!("{error}");
            ANONYMOUS_USER.to_string()
        }
    }
}

/// In-memory store, for tests and for running without a data directory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; an
    /// unreadable one is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(entries) => entries,
                Err(error) => {
                    log::warn!("Ignoring corrupt store {path:?}: {error}");
                    Map::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(error) => {
                log::warn!("Failed to read store {path:?}: {error}");
                Map::new()
            }
        };
        log::debug!("Opened store {path:?} with {} keys", entries.len());
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_vec_pretty(entries).map_err(StoreError::Encode)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("state.json");

        let store = FileStore::open(&path);
        write(&store, keys::MONITORING, &true).unwrap();
        write(&store, keys::ALERT_VOLUME, &0.5f32).unwrap();
        store.remove(keys::ALERT_VOLUME).unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(read::<bool>(&reopened, keys::MONITORING).unwrap(), Some(true));
        assert_eq!(read::<f32>(&reopened, keys::ALERT_VOLUME).unwrap(), None);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert!(store.get(keys::MONITORING).is_none());
        store.set(keys::MONITORING, json!(false)).unwrap();
        assert_eq!(FileStore::open(&path).get(keys::MONITORING), Some(json!(false)));
    }

    #[test]
    fn malformed_value_is_a_corrupt_error() {
        let store = MemoryStore::default();
        store.set(keys::ALERT_VOLUME, json!("loud")).unwrap();
        let error = read::<f32>(&store, keys::ALERT_VOLUME).unwrap_err();
        assert!(matches!(error, StoreError::Corrupt { ref key, .. } if key == keys::ALERT_VOLUME));
    }

    #[test]
    fn user_id_defaults_to_anonymous() {
        let store = MemoryStore::default();
        assert_eq!(user_id(&store), ANONYMOUS_USER);
        store.set(keys::USER_ID, json!("guard-7")).unwrap();
        assert_eq!(user_id(&store), "guard-7");
    }
}
