// models/src/identifiers.rs

use core::ops::Deref;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// Longest id accepted for a document, file or user.
pub const MAX_ID_LEN: usize = 36;

/// A document identifier. Ids are 1 to 36 characters from `[A-Za-z0-9._-]`
/// and may not start with one of the special characters.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new identifier.
    ///
    /// # Errors
    /// Returns a `ValidationError` if `value` is empty, longer than
    /// `MAX_ID_LEN`, or contains characters outside the allowed set.
    pub fn new(value: String) -> ValidationResult<Self> {
        if value.is_empty() || value.len() > MAX_ID_LEN {
            return Err(ValidationError::InvalidIdentifierLength);
        }
        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        let valid_start = value.starts_with(|c: char| c.is_ascii_alphanumeric());
        if !valid_chars || !valid_start {
            return Err(ValidationError::InvalidIdentifier(value));
        }

        Ok(Self(value))
    }

    /// Generates a fresh 32-character hex identifier.
    pub fn unique() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for DocumentId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for DocumentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ValidationError;

    fn try_from(value: String) -> ValidationResult<Self> {
        Self::new(value)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}
