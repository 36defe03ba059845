use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::domain::ports::KeyValueStore;

const PROBE_KEY: &str = "__guest_storage_probe__";

// Process-local storage. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self.entries.lock().map_err(|_| "store mutex poisoned".to_string())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self.entries.lock().map_err(|_| "store mutex poisoned".to_string())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        let mut entries = self.entries.lock().map_err(|_| "store mutex poisoned".to_string())?;
        entries.remove(key);
        Ok(())
    }

    fn write_batch(&self, changes: &[(&str, Option<&str>)]) -> Result<(), String> {
        let mut entries = self.entries.lock().map_err(|_| "store mutex poisoned".to_string())?;
        apply_changes(&mut entries, changes);
        Ok(())
    }
}

fn apply_changes(entries: &mut BTreeMap<String, String>, changes: &[(&str, Option<&str>)]) {
    for (key, value) in changes {
        match value {
            Some(value) => {
                entries.insert(key.to_string(), value.to_string());
            }
            None => {
                entries.remove(*key);
            }
        }
    }
}

// Persistent storage backed by one JSON object on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(format!("read {}: {err}", self.path.display())),
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                // A corrupt file is treated as empty; the next write replaces it.
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "guest storage file is corrupt; starting from empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| format!("create {}: {err}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|err| err.to_string())?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|err| format!("write {}: {err}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .map_err(|err| format!("replace {}: {err}", self.path.display()))
    }

    fn update<F>(&self, change: F) -> Result<(), String>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().map_err(|_| "store mutex poisoned".to_string())?;
        let mut entries = self.read_entries()?;
        change(&mut entries);
        self.write_entries(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let _guard = self.lock.lock().map_err(|_| "store mutex poisoned".to_string())?;
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    // One read-modify-rename for the whole batch.
    fn write_batch(&self, changes: &[(&str, Option<&str>)]) -> Result<(), String> {
        self.update(|entries| apply_changes(entries, changes))
    }
}

// Storage picked once at startup.
#[derive(Clone, Debug)]
pub enum SelectedStore {
    File(FileStore),
    Memory(InMemoryStore),
}

impl KeyValueStore for SelectedStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        match self {
            SelectedStore::File(store) => store.get(key),
            SelectedStore::Memory(store) => store.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        match self {
            SelectedStore::File(store) => store.set(key, value),
            SelectedStore::Memory(store) => store.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        match self {
            SelectedStore::File(store) => store.remove(key),
            SelectedStore::Memory(store) => store.remove(key),
        }
    }

    fn write_batch(&self, changes: &[(&str, Option<&str>)]) -> Result<(), String> {
        match self {
            SelectedStore::File(store) => store.write_batch(changes),
            SelectedStore::Memory(store) => store.write_batch(changes),
        }
    }
}

// Uses the file store when a write round-trip succeeds, memory otherwise.
pub fn probe_store(path: impl Into<PathBuf>) -> SelectedStore {
    let store = FileStore::new(path);
    let probe = store
        .set(PROBE_KEY, "1")
        .and_then(|_| store.remove(PROBE_KEY));

    match probe {
        Ok(()) => {
            tracing::debug!(path = %store.path().display(), "guest storage is persistent");
            SelectedStore::File(store)
        }
        Err(err) => {
            tracing::warn!(
                path = %store.path().display(),
                error = %err,
                "guest storage unavailable; quota is kept in memory"
            );
            SelectedStore::Memory(InMemoryStore::default())
        }
    }
}
