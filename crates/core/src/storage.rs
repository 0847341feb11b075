//! Key/value storage backends for the record collection.
//!
//! The store keeps the whole collection as one JSON document under a single
//! key. Backends only move strings; they know nothing about records.

use crate::{PatientError, PatientResult};
use kinesio_uuid::RecordId;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait KeyValueStorage: Send + Sync {
    /// The stored value, or `None` if the key was never written or was removed.
    fn get_item(&self, key: &str) -> PatientResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> PatientResult<()>;

    /// Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> PatientResult<()>;
}

/// One `<key>.json` file per key under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PatientResult<PathBuf> {
        let key = RecordId::parse(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> PatientResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PatientError::FileRead(e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> PatientResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(PatientError::StorageDirCreation)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(PatientError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(PatientError::FileWrite)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PatientResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PatientError::FileWrite(e)),
        }
    }
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> PatientResult<Option<String>> {
        let items = self.items.lock().map_err(|_| PatientError::LockPoisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> PatientResult<()> {
        let mut items = self.items.lock().map_err(|_| PatientError::LockPoisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> PatientResult<()> {
        let mut items = self.items.lock().map_err(|_| PatientError::LockPoisoned)?;
        items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_storage_round_trips_and_removes() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FileStorage::new(temp_dir.path().join("nested"));

        assert_eq!(storage.get_item("patients").expect("get"), None);

        storage.set_item("patients", "[]").expect("set");
        assert!(temp_dir.path().join("nested/patients.json").is_file());
        assert!(!temp_dir.path().join("nested/patients.json.tmp").exists());
        assert_eq!(
            storage.get_item("patients").expect("get").as_deref(),
            Some("[]")
        );

        storage.remove_item("patients").expect("remove");
        storage.remove_item("patients").expect("second remove is a no-op");
        assert_eq!(storage.get_item("patients").expect("get"), None);
    }

    #[test]
    fn file_storage_rejects_keys_that_escape_the_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FileStorage::new(temp_dir.path());

        assert!(matches!(
            storage.set_item("../patients", "[]"),
            Err(PatientError::Id(_))
        ));
    }

    #[test]
    fn memory_storage_round_trips() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "v").expect("set");
        assert_eq!(storage.get_item("k").expect("get").as_deref(), Some("v"));
        storage.remove_item("k").expect("remove");
        assert_eq!(storage.get_item("k").expect("get"), None);
    }
}
