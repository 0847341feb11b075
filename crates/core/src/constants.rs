//! Constants used throughout the Kinesio core crate.
//!
//! Storage keys, default delays and file-name fragments live here so the store,
//! the exports and the binaries agree on them.

use std::time::Duration;

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Key under which the whole record collection is stored.
pub const DEFAULT_STORAGE_KEY: &str = "patients";

/// Quiet period after the last edit before a record is committed.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(1500);

/// Folder name used by remote backup gateways.
pub const DEFAULT_BACKUP_FOLDER_NAME: &str = "kinesio-backups";

/// Placeholder names given to freshly created records.
pub const NEW_PATIENT_FIRST_NAME: &str = "Nuevo";
pub const NEW_PATIENT_LAST_NAME: &str = "Paciente";

/// Prefix of the JSON backup file name; the ISO date and `.json` follow.
pub const BACKUP_FILENAME_PREFIX: &str = "asistente-clinico-backup";

/// Prefix and suffix of per-record files in a remote backup folder.
pub const REMOTE_RECORD_PREFIX: &str = "patient-";
pub const REMOTE_RECORD_SUFFIX: &str = ".json";

/// MIME types of the exported artifacts.
pub const JSON_MIME_TYPE: &str = "application/json";
pub const DOCUMENT_MIME_TYPE: &str = "application/msword;charset=utf-8";
pub const SPREADSHEET_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Name of the single worksheet in a spreadsheet export.
pub const SPREADSHEET_SHEET_NAME: &str = "Ficha Paciente";

/// Column width hints for the spreadsheet export (label column, value column).
pub const SPREADSHEET_COLUMN_WIDTHS: [f64; 2] = [40.0, 80.0];
