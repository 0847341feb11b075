//! # Kinesio Core
//!
//! Core business logic for the Kinesio shoulder-intake record system.
//!
//! This crate contains pure data operations and file management:
//! - The patient record model and its default-template merge
//! - Whole-collection JSON storage with backup import/export
//! - Debounced autosave in front of the store
//! - Report synthesis into a summary view, a document and a spreadsheet
//! - Remote backup mirroring and AI-assisted analysis, behind provider traits
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest`
//! and `cli`.

pub mod analysis;
pub mod autosave;
pub mod config;
pub mod constants;
pub mod error;
pub mod exports;
pub mod merge;
pub mod record;
pub mod remote;
pub mod storage;
pub mod store;
pub mod synthesis;

pub use autosave::{Commit, DebouncedSaver};
pub use config::CoreConfig;
pub use error::{PatientError, PatientResult};
pub use exports::ExportFile;
pub use record::PatientRecord;
pub use store::PatientStore;

pub use kinesio_types::{FileName, NonEmptyText, TextError};
