//! Complementary studies, attached media and psychosocial flags.

use super::entries::Identified;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kinesio_uuid::RecordId;
use serde::{Deserialize, Serialize};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// An attached image or document, embedded as a data URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub data_url: String,
}

impl MediaFile {
    /// Builds a media entry from raw file content.
    ///
    /// The MIME type is sniffed from the content; unknown content is
    /// stored as `application/octet-stream`.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = infer::get(bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or(FALLBACK_MIME_TYPE)
            .to_string();
        let data_url = format!("data:{mime_type};base64,{}", STANDARD.encode(bytes));

        Self {
            id: RecordId::new().into_string(),
            name: name.into(),
            mime_type,
            data_url,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl Identified for MediaFile {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesAndEvolution {
    pub shoulder_rx: String,
    pub cervical_rx: String,
    pub other_studies: String,
    pub media: Vec<MediaFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagColour {
    Red,
    Orange,
    Yellow,
    Blue,
    Black,
    Pink,
}

impl FlagColour {
    pub const ALL: [FlagColour; 6] = [
        FlagColour::Red,
        FlagColour::Orange,
        FlagColour::Yellow,
        FlagColour::Blue,
        FlagColour::Black,
        FlagColour::Pink,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FlagColour::Red => "Bandera Roja",
            FlagColour::Orange => "Bandera Naranja",
            FlagColour::Yellow => "Bandera Amarilla",
            FlagColour::Blue => "Bandera Azul",
            FlagColour::Black => "Bandera Negra",
            FlagColour::Pink => "Bandera Rosa",
        }
    }
}

/// Free-text notes per flag colour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub red: String,
    pub orange: String,
    pub yellow: String,
    pub blue: String,
    pub black: String,
    pub pink: String,
}

impl Flags {
    pub fn get(&self, colour: FlagColour) -> &str {
        match colour {
            FlagColour::Red => &self.red,
            FlagColour::Orange => &self.orange,
            FlagColour::Yellow => &self.yellow,
            FlagColour::Blue => &self.blue,
            FlagColour::Black => &self.black,
            FlagColour::Pink => &self.pink,
        }
    }

    pub fn set(&mut self, colour: FlagColour, note: impl Into<String>) {
        let slot = match colour {
            FlagColour::Red => &mut self.red,
            FlagColour::Orange => &mut self.orange,
            FlagColour::Yellow => &mut self.yellow,
            FlagColour::Blue => &mut self.blue,
            FlagColour::Black => &mut self.black,
            FlagColour::Pink => &mut self.pink,
        };
        *slot = note.into();
    }

    /// Flags with a non-blank note, in colour order.
    pub fn entries(&self) -> Vec<(FlagColour, &str)> {
        FlagColour::ALL
            .into_iter()
            .map(|c| (c, self.get(c)))
            .filter(|(_, note)| !note.trim().is_empty())
            .collect()
    }
}
