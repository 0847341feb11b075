//! Record to report synthesis.
//!
//! [`summarize`] makes one pass over a record and decides which fields are
//! shown, under which label, in which section. The result is a [`Report`]:
//! the on-screen summary view itself, and the only input of the document and
//! spreadsheet renderers. A field added to the summary therefore shows up in
//! every export.
//!
//! Sections without content are never emitted.

pub mod document;
pub mod spreadsheet;
mod summary;

pub use summary::{age_on, summarize};

use serde::Serialize;

/// A record flattened into labelled, display-ready sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub patient_name: String,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Section {
    /// The value of the field labelled `label`, if present.
    pub fn field(&self, label: &str) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            Block::Field { label: l, value } if l == label => Some(value.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Block {
    /// A single labelled value.
    Field { label: String, value: String },
    /// A list of plain items, optionally under a caption.
    Items {
        label: Option<String>,
        items: Vec<String>,
    },
    /// Repeated entries with the same columns. Documents show one line per
    /// entry; spreadsheets show a header row and one row per entry.
    Entries {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// A grid shown as a table everywhere.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Narrative text, optionally under a sub-heading.
    Text {
        heading: Option<String>,
        text: String,
    },
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Collects the blocks of one section, dropping empty values as they come.
pub(crate) struct SectionBuilder {
    title: &'static str,
    blocks: Vec<Block>,
}

impl SectionBuilder {
    pub(crate) fn new(title: &'static str) -> Self {
        Self {
            title,
            blocks: Vec::new(),
        }
    }

    pub(crate) fn field(mut self, label: impl Into<String>, value: impl AsRef<str>) -> Self {
        let value = value.as_ref();
        if !is_blank(value) {
            self.blocks.push(Block::Field {
                label: label.into(),
                value: value.to_string(),
            });
        }
        self
    }

    pub(crate) fn items(mut self, label: Option<&str>, items: Vec<String>) -> Self {
        let items: Vec<String> = items.into_iter().filter(|i| !is_blank(i)).collect();
        if !items.is_empty() {
            self.blocks.push(Block::Items {
                label: label.map(str::to_string),
                items,
            });
        }
        self
    }

    pub(crate) fn entries(mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        if !rows.is_empty() {
            self.blocks.push(Block::Entries {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows,
            });
        }
        self
    }

    pub(crate) fn table(mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        if !rows.is_empty() {
            self.blocks.push(Block::Table {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows,
            });
        }
        self
    }

    pub(crate) fn text(mut self, heading: Option<&str>, text: impl AsRef<str>) -> Self {
        let text = text.as_ref();
        if !is_blank(text) {
            self.blocks.push(Block::Text {
                heading: heading.map(str::to_string),
                text: text.to_string(),
            });
        }
        self
    }

    pub(crate) fn build(self) -> Option<Section> {
        if self.blocks.is_empty() {
            return None;
        }
        Some(Section {
            title: self.title.to_string(),
            blocks: self.blocks,
        })
    }
}
