use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

const STORE_LOG_TARGET: &str = "jellyresume::storage::kv";

/// A value held in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Integer(i64),
}

impl StoredValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StoredValue::Integer(v) => Some(*v),
            StoredValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoredValue::Bool(v) => Some(*v),
            StoredValue::Integer(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Corrupt store file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Durable string-keyed store.
///
/// Writes are treated as infallible by callers; implementations that can fail
/// to persist log the failure instead of surfacing it.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<StoredValue>;
    fn set(&self, key: &str, value: StoredValue);
    fn remove(&self, key: &str);
}

/// Process-local store, used in tests and for ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.entries.lock().ok()?.get(key).copied()
    }

    fn set(&self, key: &str, value: StoredValue) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// JSON-file-backed store. Every mutation rewrites the file through a
/// temporary sibling and a rename, so readers never see a torn file.
///
/// Mutations block on file I/O; async callers go through `spawn_blocking`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, StoredValue>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };
        debug!(target: STORE_LOG_TARGET, path = %path.display(), entries = entries.len(), "Opened key-value store");
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, StoredValue>) {
        if let Err(e) = write_atomically(&self.path, entries) {
            warn!(target: STORE_LOG_TARGET, path = %self.path.display(), "Failed to persist key-value store: {}", e);
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.entries.lock().ok()?.get(key).copied()
    }

    fn set(&self, key: &str, value: StoredValue) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.get(key) == Some(&value) {
                return;
            }
            entries.insert(key.to_string(), value);
            self.persist(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(key).is_some() {
                self.persist(&entries);
            }
        }
    }
}

/// Serializes `value` as pretty JSON to `path` via a temp file and rename.
pub(crate) fn write_atomically<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
