//! Small validated text types shared by the Kinesio crates.
//!
//! - [`NonEmptyText`] for configuration values and names that must carry content.
//! - [`FileName`] for a single path component that is safe to hand to a filesystem
//!   or a download dialog.

use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, returning [`TextError::Empty`] for blank input.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A single file-name component.
///
/// Characters that are reserved on common filesystems (`/ \ : * ? " < > |`) and
/// control characters are replaced with `-`; runs of whitespace collapse to one
/// space. Leading dots are stripped so the result is never hidden or relative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(NonEmptyText);

impl FileName {
    /// Sanitises `raw` into a file name.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if nothing usable remains after sanitising.
    pub fn sanitised(raw: impl AsRef<str>) -> Result<Self, TextError> {
        let replaced: String = raw
            .as_ref()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                c if c.is_control() => '-',
                c => c,
            })
            .collect();

        let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
        NonEmptyText::new(collapsed.trim_start_matches('.')).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
