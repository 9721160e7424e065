// models/src/errors.rs

use std::io;

pub use thiserror::Error;
use uuid::Error as UuidError;

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("{collection} document {id} was not found")]
    NotFound { collection: String, id: String },
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid data provided: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{collection} document {id} changed concurrently (expected revision {expected}, found {found})")]
    Conflict {
        collection: String,
        id: String,
        expected: u64,
        found: u64,
    },
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Authentication error: {0}")]
    Unauthorized(String),
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[cfg(feature = "sled-errors")]
    #[error(transparent)]
    Sled(#[from] sled::Error),
    #[error("UUID parsing or generation error: {0}")]
    Uuid(#[from] UuidError),
    #[error("An internal error occurred: {0}")]
    Internal(String),
}

impl ClinicError {
    pub fn not_found(collection: &str, id: impl Into<String>) -> Self {
        ClinicError::NotFound {
            collection: collection.to_string(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClinicError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClinicError::Conflict { .. })
    }
}

impl From<serde_json::Error> for ClinicError {
    fn from(err: serde_json::Error) -> Self {
        ClinicError::SerializationError(format!("JSON processing error: {}", err))
    }
}

/// A validation error raised while checking user-supplied records.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// An identifier contains characters outside `[A-Za-z0-9._-]` or starts
    /// with a special character.
    #[error("identifier '{0}' is invalid")]
    InvalidIdentifier(String),
    /// An identifier is empty or longer than 36 characters.
    #[error("identifier has invalid length")]
    InvalidIdentifierLength,
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),
    /// A stored enum index has no matching member.
    #[error("{index} is not a valid {kind}")]
    InvalidEnumIndex { kind: &'static str, index: u8 },
    /// A time of day is not in `HH:MM` form.
    #[error("invalid time of day: {0}")]
    InvalidTime(String),
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("message content is empty")]
    EmptyMessage,
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
}

pub type ClinicResult<T> = Result<T, ClinicError>;

pub type ValidationResult<T> = Result<T, ValidationError>;
