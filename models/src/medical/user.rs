// models/src/medical/user.rs

use serde::{Deserialize, Serialize};

use crate::document::{Entity, Stored};
use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::DocumentId;
use crate::validation::{require, validate_email, Validate};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

crate::labeled_enum! {
    pub enum Role ("role") {
        Admin = 0 => "Admin",
        Patient = 1 => "Patient",
    }
}

/// An account as stored. The password is only ever held as a hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
}

impl Validate for User {
    fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        require("display_name", &self.display_name)?;
        require("password_hash", &self.password_hash)
    }
}

/// Registration input carrying the plaintext password.
#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl Validate for NewUser {
    fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        require("display_name", &self.display_name)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::InvalidRange(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// What the API reveals about an account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: DocumentId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl From<&Stored<User>> for PublicUser {
    fn from(user: &Stored<User>) -> Self {
        PublicUser {
            id: user.id.clone(),
            email: user.record.email.clone(),
            display_name: user.record.display_name.clone(),
            role: user.record.role,
        }
    }
}
