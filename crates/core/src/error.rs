use crate::remote::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("patient not found: {0}")]
    NotFound(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write patient store: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read patient store: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize patient: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize patient: {0}")]
    Deserialization(serde_json::Error),
    #[error("storage lock poisoned")]
    LockPoisoned,

    #[error("backup rejected: {0}")]
    ImportRejected(String),
    #[error("failed to build spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("remote backup failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("invalid id: {0}")]
    Id(#[from] kinesio_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] kinesio_types::TextError),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
