use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// An opaque, validated record or entry identifier.
///
/// # Construction
/// - [`RecordId::new`] allocates a fresh canonical id.
/// - [`RecordId::parse`] validates an externally supplied id (CLI argument, URL
///   path segment, imported backup).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Allocates a new id in canonical form (32 lowercase hex characters).
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Validates an externally supplied id.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is empty or whitespace, has
    /// leading/trailing whitespace, or contains `/`, `\`, `..` or a NUL byte.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if input.trim().is_empty() {
            return Err(UuidError::InvalidInput("id must not be empty".into()));
        }
        if input.trim() != input {
            return Err(UuidError::InvalidInput(format!(
                "id must not have surrounding whitespace, got: '{}'",
                input
            )));
        }
        if input.contains('/') || input.contains('\\') || input.contains("..") {
            return Err(UuidError::InvalidInput(format!(
                "id must not contain path separators, got: '{}'",
                input
            )));
        }
        if input.contains('\0') {
            return Err(UuidError::InvalidInput("id must not contain NUL".into()));
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns true if this id is in the canonical generated form.
    pub fn is_canonical(&self) -> bool {
        self.0.len() == 32
            && self
                .0
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}
