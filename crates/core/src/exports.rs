//! Downloadable artifacts: JSON backup, patient document, patient spreadsheet.

use crate::constants::{
    BACKUP_FILENAME_PREFIX, DOCUMENT_MIME_TYPE, JSON_MIME_TYPE, SPREADSHEET_MIME_TYPE,
};
use crate::record::PatientRecord;
use crate::store::PatientStore;
use crate::synthesis::{document, spreadsheet, summarize};
use crate::PatientResult;
use chrono::NaiveDate;
use kinesio_types::FileName;

/// A file ready to be handed to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn backup_filename(today: NaiveDate) -> String {
    format!("{BACKUP_FILENAME_PREFIX}-{}.json", iso_date(today))
}

/// `"<Last> <First> - <date>.<extension>"`, safe for any filesystem.
///
/// Missing names fall back to `Sin` and `Nombre`.
pub fn record_filename(
    record: &PatientRecord,
    today: NaiveDate,
    extension: &str,
) -> PatientResult<String> {
    let fallback = |value: &str, default: &'static str| {
        let value = value.trim();
        if value.is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    };
    let last = fallback(&record.identity.last_name, "Sin");
    let first = fallback(&record.identity.first_name, "Nombre");

    let name = FileName::sanitised(format!(
        "{last} {first} - {}.{extension}",
        iso_date(today)
    ))?;
    Ok(name.to_string())
}

/// The whole collection as an indented JSON backup.
pub fn backup_export(store: &PatientStore, today: NaiveDate) -> PatientResult<ExportFile> {
    Ok(ExportFile {
        filename: backup_filename(today),
        mime_type: JSON_MIME_TYPE,
        bytes: store.export_all()?.into_bytes(),
    })
}

pub fn document_export(record: &PatientRecord, today: NaiveDate) -> PatientResult<ExportFile> {
    let report = summarize(record, today);
    Ok(ExportFile {
        filename: record_filename(record, today, "doc")?,
        mime_type: DOCUMENT_MIME_TYPE,
        bytes: document::render_bytes(&report),
    })
}

pub fn spreadsheet_export(record: &PatientRecord, today: NaiveDate) -> PatientResult<ExportFile> {
    let report = summarize(record, today);
    Ok(ExportFile {
        filename: record_filename(record, today, "xlsx")?,
        mime_type: SPREADSHEET_MIME_TYPE,
        bytes: spreadsheet::render_bytes(&report)?,
    })
}
