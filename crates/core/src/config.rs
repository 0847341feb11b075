//! Core runtime configuration.
//!
//! Configuration is resolved once at process start-up and then passed into core
//! services as an `Arc<CoreConfig>`. Services never read environment variables
//! themselves; binaries do that and hand the parsed values over.

use crate::constants::{
    DEFAULT_BACKUP_FOLDER_NAME, DEFAULT_PATIENT_DATA_DIR, DEFAULT_SAVE_DELAY, DEFAULT_STORAGE_KEY,
};
use crate::{PatientError, PatientResult};
use kinesio_types::NonEmptyText;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for the autosave delay; anything longer is almost certainly a typo.
const MAX_SAVE_DELAY: Duration = Duration::from_secs(60);

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    storage_key: NonEmptyText,
    save_delay: Duration,
    backup_folder_name: NonEmptyText,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if `save_delay` is zero or longer than a minute.
    pub fn new(
        patient_data_dir: PathBuf,
        storage_key: NonEmptyText,
        save_delay: Duration,
        backup_folder_name: NonEmptyText,
    ) -> PatientResult<Self> {
        if save_delay.is_zero() || save_delay > MAX_SAVE_DELAY {
            return Err(PatientError::InvalidInput(format!(
                "save delay must be between 1ms and {}s, got {}ms",
                MAX_SAVE_DELAY.as_secs(),
                save_delay.as_millis()
            )));
        }

        Ok(Self {
            patient_data_dir,
            storage_key,
            save_delay,
            backup_folder_name,
        })
    }

    /// Configuration with every default except the data directory.
    pub fn with_data_dir(patient_data_dir: PathBuf) -> PatientResult<Self> {
        Self::new(
            patient_data_dir,
            NonEmptyText::new(DEFAULT_STORAGE_KEY)?,
            DEFAULT_SAVE_DELAY,
            NonEmptyText::new(DEFAULT_BACKUP_FOLDER_NAME)?,
        )
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn storage_key(&self) -> &str {
        self.storage_key.as_str()
    }

    pub fn save_delay(&self) -> Duration {
        self.save_delay
    }

    pub fn backup_folder_name(&self) -> &str {
        self.backup_folder_name.as_str()
    }
}

/// Resolve the patient data directory from an optional override.
pub fn patient_data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PATIENT_DATA_DIR))
}

/// Parse the autosave delay (milliseconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default delay.
pub fn save_delay_from_env_value(value: Option<String>) -> PatientResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_SAVE_DELAY),
        Some(v) => v.parse::<u64>().map(Duration::from_millis).map_err(|e| {
            PatientError::InvalidInput(format!("invalid save delay '{}': {}", v, e))
        }),
    }
}
