//! The record store: CRUD over the whole patient collection.
//!
//! ## Storage layout
//!
//! One JSON array of records under [`CoreConfig::storage_key`]:
//!
//! ```text
//! <patient_data_dir>/
//!   patients.json    # [ { "id": "...", "firstName": "...", ... }, ... ]
//! ```
//!
//! Every write is a read-modify-write of the whole array. Writers in this
//! process are serialised by a lock shared between clones of the store; there
//! is no protection against a second process writing the same file.
//!
//! Every record returned passes through [`merge_defaults`]. Array entries that
//! cannot be shaped into a record are skipped when listing but kept verbatim on
//! write, so one damaged entry never takes its neighbours down with it.

use crate::config::CoreConfig;
use crate::merge::{merge_defaults, stored_id};
use crate::record::PatientRecord;
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::{PatientError, PatientResult};
use chrono::Utc;
use kinesio_uuid::RecordId;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct PatientStore {
    cfg: Arc<CoreConfig>,
    storage: Arc<dyn KeyValueStorage>,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for PatientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientStore")
            .field("storage_key", &self.cfg.storage_key())
            .finish_non_exhaustive()
    }
}

impl PatientStore {
    pub fn new(cfg: Arc<CoreConfig>, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            cfg,
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// A store backed by files under the configured patient data directory.
    pub fn open(cfg: Arc<CoreConfig>) -> Self {
        let storage = FileStorage::new(cfg.patient_data_dir());
        Self::new(cfg, Arc::new(storage))
    }

    /// A store that lives only as long as the process.
    pub fn in_memory(cfg: Arc<CoreConfig>) -> Self {
        Self::new(cfg, Arc::new(MemoryStorage::new()))
    }

    pub fn config(&self) -> &Arc<CoreConfig> {
        &self.cfg
    }

    /// Reads the raw stored array.
    ///
    /// A payload that is not a JSON array is discarded and the key cleared.
    /// Storage read failures propagate; callers that must not fail decide what
    /// to do with them.
    fn load_entries(&self) -> PatientResult<Vec<Value>> {
        let key = self.cfg.storage_key();
        let Some(raw) = self.storage.get_item(key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(_) => {
                tracing::warn!("stored patient collection is not an array, clearing it");
                self.clear_corrupt(key);
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!("failed to parse stored patient collection, clearing it: {}", e);
                self.clear_corrupt(key);
                Ok(Vec::new())
            }
        }
    }

    fn clear_corrupt(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            tracing::warn!("failed to clear corrupt patient collection: {}", e);
        }
    }

    fn write_entries(&self, entries: &[Value]) -> PatientResult<()> {
        let raw = serde_json::to_string(entries).map_err(PatientError::Serialization)?;
        self.storage.set_item(self.cfg.storage_key(), &raw)
    }

    /// All records, in stored order, merged with the default template.
    ///
    /// Never fails: an unreadable or corrupt store yields an empty list.
    pub fn list_all(&self) -> Vec<PatientRecord> {
        let entries = match self.load_entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("failed to read patient collection: {}", e);
                return Vec::new();
            }
        };

        entries
            .iter()
            .filter_map(|entry| match merge_defaults(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        "skipping stored patient {}: {}",
                        stored_id(entry).unwrap_or("<no id>"),
                        e
                    );
                    None
                }
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<PatientRecord> {
        self.list_all().into_iter().find(|r| r.id == id)
    }

    /// Inserts or replaces the record with the same id and writes the collection.
    ///
    /// # Errors
    ///
    /// Returns `PatientError` if the id is not a valid record id, or the
    /// collection cannot be read, serialised or written.
    pub fn save(&self, record: PatientRecord) -> PatientResult<PatientRecord> {
        RecordId::parse(&record.id)?;
        let value = serde_json::to_value(&record).map_err(PatientError::Serialization)?;

        let _guard = self.write_lock.lock().map_err(|_| PatientError::LockPoisoned)?;
        let mut entries = self.load_entries()?;
        match entries
            .iter_mut()
            .find(|entry| stored_id(entry) == Some(record.id.as_str()))
        {
            Some(slot) => *slot = value,
            None => entries.push(value),
        }
        self.write_entries(&entries)?;

        tracing::debug!("saved patient {}", record.id);
        Ok(record)
    }

    /// Deletes the record with `id`. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> PatientResult<bool> {
        let _guard = self.write_lock.lock().map_err(|_| PatientError::LockPoisoned)?;
        let mut entries = self.load_entries()?;
        let before = entries.len();
        entries.retain(|entry| stored_id(entry) != Some(id));
        if entries.len() == before {
            return Ok(false);
        }
        self.write_entries(&entries)?;

        tracing::info!("deleted patient {}", id);
        Ok(true)
    }

    /// Creates and persists a new record with placeholder names.
    pub fn create(&self) -> PatientResult<PatientRecord> {
        let record = self.save(PatientRecord::new_patient(Utc::now()))?;
        tracing::info!("created patient {}", record.id);
        Ok(record)
    }

    /// Replaces the whole collection.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] on an invalid or duplicated id,
    /// before anything is written.
    pub fn replace_all(&self, records: &[PatientRecord]) -> PatientResult<()> {
        let mut seen = HashSet::new();
        for record in records {
            RecordId::parse(&record.id)?;
            if !seen.insert(record.id.as_str()) {
                return Err(PatientError::InvalidInput(format!(
                    "duplicate patient id: {}",
                    record.id
                )));
            }
        }

        let entries = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PatientError::Serialization)?;

        let _guard = self.write_lock.lock().map_err(|_| PatientError::LockPoisoned)?;
        self.write_entries(&entries)
    }

    /// The whole collection as an indented JSON array.
    pub fn export_all(&self) -> PatientResult<String> {
        serde_json::to_string_pretty(&self.list_all()).map_err(PatientError::Serialization)
    }

    /// Validates a backup and, only if every entry is acceptable, replaces the
    /// collection with it.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::ImportRejected`] if the text is not a JSON array
    /// of objects, each with a non-empty string `id`, unique within the backup,
    /// and shaped like a record. The stored collection is untouched on error.
    pub fn import(&self, text: &str) -> PatientResult<Vec<PatientRecord>> {
        let records = parse_backup(text)?;
        self.replace_all(&records)?;
        tracing::info!("imported {} patients", records.len());
        Ok(records)
    }
}

/// Validates backup text and shapes every entry into a record.
pub fn parse_backup(text: &str) -> PatientResult<Vec<PatientRecord>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| PatientError::ImportRejected(format!("not valid JSON: {e}")))?;
    let Value::Array(entries) = value else {
        return Err(PatientError::ImportRejected(
            "backup must be a JSON array of patients".into(),
        ));
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let id = stored_id(entry).ok_or_else(|| {
            PatientError::ImportRejected(format!("entry {index} has no id"))
        })?;
        RecordId::parse(id)
            .map_err(|e| PatientError::ImportRejected(format!("entry {index}: {e}")))?;
        if !seen.insert(id.to_string()) {
            return Err(PatientError::ImportRejected(format!(
                "duplicate patient id: {id}"
            )));
        }
        let record = merge_defaults(entry)
            .map_err(|e| PatientError::ImportRejected(format!("entry {index}: {e}")))?;
        records.push(record);
    }
    Ok(records)
}
