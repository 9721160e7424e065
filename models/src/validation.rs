// models/src/validation.rs

use chrono::NaiveTime;

use crate::errors::{ValidationError, ValidationResult};

/// Implemented by the `New*` inputs accepted from forms and imports.
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

pub fn require(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let invalid = || ValidationError::InvalidEmail(email.to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 => Ok(()),
        _ => Err(invalid()),
    }
}

/// Accepts an optional leading `+` followed by 7 to 15 digits; spaces,
/// dashes and parentheses are ignored.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut digits = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '(' | ')' => {}
            _ => return Err(ValidationError::InvalidPhone(phone.to_string())),
        }
    }
    if !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidPhone(phone.to_string()));
    }
    Ok(())
}

pub fn parse_time_of_day(value: &str) -> ValidationResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidTime(value.to_string()))
}
