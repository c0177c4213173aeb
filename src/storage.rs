use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Host key-value storage. No expiry, no transactions: last write wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON file holding every key, rewritten on each `set`
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, Value>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                // Memo only; an unreadable file is dropped
                serde_json::from_str(&content).unwrap_or_else(|e| {
                    warn!(path = %path.display(), "Unreadable store, starting empty: {}", e);
                    HashMap::new()
                })
            }
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                warn!("Store lock poisoned: {}", e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::Storage(e.to_string()))?;
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_last_write_wins() {
        let store = MemoryStore::new();
        assert_eq!(store.get("42"), None);

        store.set("42", json!({"barrage_list": []})).unwrap();
        store.set("42", json!({"barrage_list": [1]})).unwrap();
        assert_eq!(store.get("42"), Some(json!({"barrage_list": [1]})));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.set("1396", json!({"barrage_list": [{"segment_start": 0}]})).unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("1396"),
            Some(json!({"barrage_list": [{"segment_start": 0}]}))
        );
        assert_eq!(reopened.get("missing"), None);
    }

    #[test]
    fn test_file_store_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("1396"), None);

        store.set("1396", json!({"barrage_list": []})).unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("1396"), Some(json!({"barrage_list": []})));
    }
}
