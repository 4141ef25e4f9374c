//! Single-slot key/value storage backing the session cache

use crate::error::StorageError;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// Per-page persistent string storage
pub trait SlotStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage that lives as long as the process
#[allow(dead_code)] // Used by tests and embedders without a state directory
#[derive(Debug, Default)]
pub struct MemorySlotStorage {
    slots: Mutex<HashMap<String, String>>,
}

#[allow(dead_code)]
impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slots<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StorageError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::Unavailable("slot lock poisoned".to_string()))?;
        Ok(f(&mut slots))
    }
}

impl SlotStorage for MemorySlotStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_slots(|slots| slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_slots(|slots| {
            slots.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_slots(|slots| {
            slots.remove(key);
        })
    }
}

/// Storage persisted as one file per key, so a restarted host resumes
/// the cached session
#[derive(Debug, Clone)]
pub struct FileSlotStorage {
    dir: PathBuf,
}

impl FileSlotStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(self.dir.join(format!("{key}.json")))
        } else {
            Err(StorageError::Unavailable(format!("invalid slot key {key:?}")))
        }
    }
}

impl SlotStorage for FileSlotStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
