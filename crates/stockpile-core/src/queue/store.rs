//! Pluggable persistence for the offline edit queue
//!
//! The queue never owns ambient global state; callers hand it a store.
//! `MemoryQueueStore` is the volatile default, `JsonFileQueueStore` keeps
//! entries across process restarts for the CLI. A store belongs to one
//! client instance and is never contended across processes.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use uuid::Uuid;

use super::QueuedEdit;
use crate::error::{Error, Result};

/// Storage for queued edits, in enqueue order
pub trait QueueStore: Send + Sync {
    /// All entries, oldest first
    fn load(&self) -> Result<Vec<QueuedEdit>>;

    /// Append a new entry at the tail
    fn append(&self, edit: &QueuedEdit) -> Result<()>;

    /// Persist a mutated entry in place
    fn update(&self, edit: &QueuedEdit) -> Result<()>;

    /// Remove entries by id; unknown ids are ignored
    fn remove(&self, ids: &[Uuid]) -> Result<()>;
}

/// In-memory store; contents vanish with the process
#[derive(Default)]
pub struct MemoryQueueStore {
    entries: Mutex<Vec<QueuedEdit>>,
}

impl MemoryQueueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<QueuedEdit>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Database("Queue store mutex poisoned".to_string()))
    }
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> Result<Vec<QueuedEdit>> {
        Ok(self.lock()?.clone())
    }

    fn append(&self, edit: &QueuedEdit) -> Result<()> {
        self.lock()?.push(edit.clone());
        Ok(())
    }

    fn update(&self, edit: &QueuedEdit) -> Result<()> {
        let mut entries = self.lock()?;
        if let Some(slot) = entries.iter_mut().find(|entry| entry.id == edit.id) {
            *slot = edit.clone();
        }
        Ok(())
    }

    fn remove(&self, ids: &[Uuid]) -> Result<()> {
        self.lock()?.retain(|entry| !ids.contains(&entry.id));
        Ok(())
    }
}

/// JSON-file-backed store for a single client instance
pub struct JsonFileQueueStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileQueueStore {
    /// Open (or lazily create) the store file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            guard: Mutex::new(()),
        })
    }

    fn read_entries(&self) -> Result<Vec<QueuedEdit>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn write_entries(&self, entries: &[QueuedEdit]) -> Result<()> {
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    fn with_entries(&self, mutate: impl FnOnce(&mut Vec<QueuedEdit>)) -> Result<()> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::Database("Queue store mutex poisoned".to_string()))?;
        let mut entries = self.read_entries()?;
        mutate(&mut entries);
        self.write_entries(&entries)
    }
}

impl QueueStore for JsonFileQueueStore {
    fn load(&self) -> Result<Vec<QueuedEdit>> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::Database("Queue store mutex poisoned".to_string()))?;
        self.read_entries()
    }

    fn append(&self, edit: &QueuedEdit) -> Result<()> {
        self.with_entries(|entries| entries.push(edit.clone()))
    }

    fn update(&self, edit: &QueuedEdit) -> Result<()> {
        self.with_entries(|entries| {
            if let Some(slot) = entries.iter_mut().find(|entry| entry.id == edit.id) {
                *slot = edit.clone();
            }
        })
    }

    fn remove(&self, ids: &[Uuid]) -> Result<()> {
        self.with_entries(|entries| entries.retain(|entry| !ids.contains(&entry.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EditMethod;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn edit(target: &str) -> QueuedEdit {
        QueuedEdit::new(EditMethod::Put, target, json!({"version": 1}))
    }

    #[test]
    fn test_memory_store_preserves_order() {
        let store = MemoryQueueStore::new();
        store.append(&edit("/a")).unwrap();
        store.append(&edit("/b")).unwrap();
        store.append(&edit("/c")).unwrap();

        let targets: Vec<String> = store
            .load()
            .unwrap()
            .into_iter()
            .map(|entry| entry.target)
            .collect();
        assert_eq!(targets, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_memory_store_update_in_place() {
        let store = MemoryQueueStore::new();
        let mut entry = edit("/a");
        store.append(&entry).unwrap();

        entry.attempts = 2;
        store.update(&entry).unwrap();

        assert_eq!(store.load().unwrap()[0].attempts, 2);
    }

    #[test]
    fn test_file_store_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("queue.json");

        let store = JsonFileQueueStore::open(&path).unwrap();
        store.append(&edit("/a")).unwrap();
        store.append(&edit("/b")).unwrap();

        // Fresh handle reads the same contents back
        let reopened = JsonFileQueueStore::open(&path).unwrap();
        let entries = reopened.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target, "/a");
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let tmp = tempdir().unwrap();
        let store = JsonFileQueueStore::open(tmp.path().join("absent.json")).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_remove() {
        let tmp = tempdir().unwrap();
        let store = JsonFileQueueStore::open(tmp.path().join("queue.json")).unwrap();
        let first = edit("/a");
        let second = edit("/b");
        store.append(&first).unwrap();
        store.append(&second).unwrap();

        store.remove(&[first.id]).unwrap();
        let entries = store.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "/b");
    }
}
