//! Record and entry identifiers.
//!
//! Every patient record, and every list entry inside a record (medications,
//! associated diseases, custom tests, custom scales, media files), carries an
//! opaque string id that is unique within its scope and never changes.
//!
//! ## Generated ids
//! Ids allocated by this crate use the canonical UUID form: **32 lowercase
//! hexadecimal characters** without hyphens, the same value you would get from
//! `Uuid::new_v4().simple().to_string()`.
//!
//! ## Accepted ids
//! Records written by earlier versions of the application use other shapes (for
//! example millisecond timestamps such as `1712345678901`). Those remain valid, so
//! [`RecordId::parse`] does not insist on the canonical form. It only rejects ids
//! that are blank or that could escape a directory when embedded in a file name.

mod id;

pub use id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
