//! Spreadsheet renderer: a row matrix, then an `.xlsx` workbook.

use super::{Block, Report};
use crate::constants::{SPREADSHEET_COLUMN_WIDTHS, SPREADSHEET_SHEET_NAME};
use crate::PatientResult;
use rust_xlsxwriter::Workbook;

pub type Row = Vec<String>;

fn row<I, S>(cells: I) -> Row
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    cells.into_iter().map(Into::into).collect()
}

/// Flattens `report` into label/value rows.
///
/// Each section starts with an empty spacer row and its upper-cased title.
/// Entry lists and tables become a header row followed by one row per entry.
pub fn rows(report: &Report) -> Vec<Row> {
    let mut out = vec![row(["FICHA DE PACIENTE"])];
    if !report.patient_name.is_empty() {
        out.push(row(["Nombre Completo", report.patient_name.as_str()]));
    }

    for section in &report.sections {
        out.push(Row::new());
        out.push(row([section.title.to_uppercase()]));

        for block in &section.blocks {
            match block {
                Block::Field { label, value } => out.push(row([label, value])),
                Block::Items { label, items } => {
                    if let Some(label) = label {
                        out.push(row([label]));
                    }
                    out.extend(items.iter().map(|item| row([item])));
                }
                Block::Entries { headers, rows } | Block::Table { headers, rows } => {
                    out.push(headers.clone());
                    out.extend(rows.iter().cloned());
                }
                Block::Text { heading, text } => {
                    let label = heading.as_deref().unwrap_or(section.title.as_str());
                    out.push(row([label, text.as_str()]));
                }
            }
        }
    }

    out
}

/// Writes `rows` to a single-sheet workbook and returns the file content.
///
/// # Errors
///
/// Returns `PatientError::Spreadsheet` if the workbook cannot be produced.
pub fn workbook_bytes(rows: &[Row]) -> PatientResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SPREADSHEET_SHEET_NAME)?;
        for (col, width) in SPREADSHEET_COLUMN_WIDTHS.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }

        for (r, cells) in rows.iter().enumerate() {
            for (c, cell) in cells.iter().enumerate() {
                if !cell.is_empty() {
                    worksheet.write_string(r as u32, c as u16, cell)?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

/// Rows and workbook in one step.
pub fn render_bytes(report: &Report) -> PatientResult<Vec<u8>> {
    workbook_bytes(&rows(report))
}
