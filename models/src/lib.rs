// models/src/lib.rs

pub mod chat;
pub mod document;
pub mod errors;
pub mod identifiers;
pub mod labels;
pub mod medical;
pub mod validation;

pub use chat::{parse_messages, stringify_messages, Chat, Message};
pub use document::{Document, Entity, Stored};
pub use errors::{ClinicError, ClinicResult, ValidationError, ValidationResult};
pub use identifiers::DocumentId;
pub use labels::Labeled;
pub use validation::Validate;
