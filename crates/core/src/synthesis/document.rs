//! HTML document renderer.
//!
//! Word processors open an HTML file served as `application/msword` as an
//! editable document. The byte form starts with a UTF-8 BOM so accented text
//! is decoded correctly.

use super::{Block, Report};

const BOM: &str = "\u{FEFF}";

const STYLE: &str = "\
body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
h1 { color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 10px; }
h2 { color: #3498db; border-bottom: 1px solid #ccc; padding-bottom: 5px; margin-top: 30px; }
h3 { color: #2980b9; margin-top: 20px; }
ul { list-style-type: none; padding-left: 0; }
li { margin-bottom: 8px; }
strong { color: #555; }
table { border-collapse: collapse; width: 100%; margin-top: 15px; }
th, td { border: 1px solid #ccc; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
";

/// Escapes markup characters and keeps line breaks as `<br>`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

fn or_na(value: &str) -> String {
    if value.trim().is_empty() {
        "N/A".to_string()
    } else {
        escape(value)
    }
}

fn render_block(html: &mut String, block: &Block) {
    match block {
        Block::Field { label, value } => {
            html.push_str(&format!(
                "<ul><li><strong>{}:</strong> {}</li></ul>\n",
                escape(label),
                escape(value)
            ));
        }
        Block::Items { label, items } => {
            if let Some(label) = label {
                html.push_str(&format!("<p><strong>{}:</strong></p>\n", escape(label)));
            }
            html.push_str("<ul>");
            for item in items {
                html.push_str(&format!("<li>{}</li>", escape(item)));
            }
            html.push_str("</ul>\n");
        }
        Block::Entries { rows, .. } => {
            html.push_str("<ul>");
            for row in rows {
                let (first, rest) = row.split_first().map_or(("", &[][..]), |(f, r)| {
                    (f.as_str(), r)
                });
                let name = if first.trim().is_empty() {
                    "Sin nombre".to_string()
                } else {
                    escape(first)
                };
                let details: Vec<String> = rest.iter().map(|v| or_na(v)).collect();
                html.push_str(&format!(
                    "<li><strong>{}:</strong> {}</li>",
                    name,
                    details.join(" - ")
                ));
            }
            html.push_str("</ul>\n");
        }
        Block::Table { headers, rows } => {
            html.push_str("<table>\n<thead><tr>");
            for header in headers {
                html.push_str(&format!("<th>{}</th>", escape(header)));
            }
            html.push_str("</tr></thead>\n<tbody>\n");
            for row in rows {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str(&format!("<td>{}</td>", escape(cell)));
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</tbody>\n</table>\n");
        }
        Block::Text { heading, text } => {
            if let Some(heading) = heading {
                html.push_str(&format!("<h3>{}</h3>\n", escape(heading)));
            }
            html.push_str(&format!("<p>{}</p>\n", escape(text)));
        }
    }
}

/// Renders `report` as a standalone HTML document.
pub fn render_html(report: &Report) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str("<title>Ficha de Paciente</title>\n");
    html.push_str(&format!("<style>\n{STYLE}</style>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(&report.title)));

    for section in &report.sections {
        html.push_str(&format!("<h2>{}</h2>\n", escape(&section.title)));
        for block in &section.blocks {
            render_block(&mut html, block);
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// The document as file content: BOM followed by the HTML.
pub fn render_bytes(report: &Report) -> Vec<u8> {
    let mut out = String::from(BOM);
    out.push_str(&render_html(report));
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Medication, PatientRecord};
    use crate::synthesis::summarize;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date")
    }

    #[test]
    fn empty_record_renders_no_section_headings() {
        let mut record = PatientRecord::template();
        record.id = "p1".into();
        record.identity.first_name = String::new();
        record.identity.last_name = String::new();

        let html = render_html(&summarize(&record, today()));
        assert!(!html.contains("<h2>"), "{html}");
        assert!(html.contains("<h1>"));
    }

    #[test]
    fn values_are_escaped_and_newlines_preserved() {
        let mut record = PatientRecord::template();
        record.id = "p1".into();
        record.final_summary = "Dolor <agudo>\nmejora & estable".into();

        let html = render_html(&summarize(&record, today()));
        assert!(html.contains("<h2>Resumen Final y Justificación</h2>"));
        assert!(html.contains("<p>Dolor &lt;agudo&gt;<br>mejora &amp; estable</p>"));
    }

    #[test]
    fn medications_render_as_list_with_fallbacks() {
        let mut record = PatientRecord::template();
        record.id = "p1".into();
        record.medications.push(Medication::new("Tramadol", "50mg", ""));
        record.medications.push(Medication::new("", "", ""));

        let html = render_html(&summarize(&record, today()));
        assert!(html.contains("<li><strong>Tramadol:</strong> 50mg - N/A</li>"));
        assert!(html.contains("<li><strong>Sin nombre:</strong> N/A - N/A</li>"));
    }

    #[test]
    fn bytes_start_with_bom() {
        let mut record = PatientRecord::template();
        record.id = "p1".into();
        let bytes = render_bytes(&summarize(&record, today()));
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert!(String::from_utf8(bytes).unwrap().contains("Nuevo"));
    }
}
