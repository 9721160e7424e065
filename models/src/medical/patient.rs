// models/src/medical/patient.rs

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Entity;
use crate::errors::{ValidationError, ValidationResult};
use crate::validation::{require, validate_email, validate_phone, Validate};

crate::labeled_enum! {
    pub enum Gender ("gender") {
        Male = 0 => "Male",
        Female = 1 => "Female",
        Other = 2 => "Other",
    }
}

crate::labeled_enum! {
    pub enum BloodType ("blood type") {
        APositive = 0 => "A+",
        ANegative = 1 => "A-",
        BPositive = 2 => "B+",
        BNegative = 3 => "B-",
        AbPositive = 4 => "AB+",
        AbNegative = 5 => "AB-",
        OPositive = 6 => "O+",
        ONegative = 7 => "O-",
        Unknown = 8 => "Unknown",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    #[serde(default = "unknown_blood_type")]
    pub blood_type: BloodType,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub current_medications: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub emergency_contact_relationship: Option<String>,
    /// Account linked to this record, when the patient has signed up.
    #[serde(default)]
    pub user_id: Option<String>,
}

fn unknown_blood_type() -> BloodType {
    BloodType::Unknown
}

impl Entity for Patient {
    const COLLECTION: &'static str = "patients";
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

impl Validate for Patient {
    fn validate(&self) -> ValidationResult<()> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        validate_email(&self.email)?;
        validate_phone(&self.phone)?;
        if self.date_of_birth > Utc::now().date_naive() {
            return Err(ValidationError::InvalidDateFormat(format!(
                "date of birth {} is in the future",
                self.date_of_birth
            )));
        }
        if let Some(phone) = &self.emergency_contact_phone {
            validate_phone(phone)?;
            if self.emergency_contact_name.as_deref().map_or(true, |n| n.trim().is_empty()) {
                return Err(ValidationError::MissingField("emergency_contact_name"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Patient {
        Patient {
            first_name: "Omar".to_string(),
            last_name: "Haddad".to_string(),
            email: "omar@example.com".to_string(),
            phone: "+44 20 7946 0018".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1988, 4, 2).unwrap(),
            gender: Gender::Male,
            blood_type: BloodType::ONegative,
            address: None,
            allergies: Some("penicillin".to_string()),
            current_medications: None,
            medical_history: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            emergency_contact_relationship: None,
            user_id: None,
        }
    }

    #[test]
    fn valid_patient_passes() {
        assert!(sample().validate().is_ok());
        assert_eq!(sample().full_name(), "Omar Haddad");
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let mut patient = sample();
        patient.date_of_birth = Utc::now().date_naive() + chrono::Duration::days(3);
        assert!(matches!(patient.validate(), Err(ValidationError::InvalidDateFormat(_))));
    }

    #[test]
    fn emergency_phone_requires_a_name() {
        let mut patient = sample();
        patient.emergency_contact_phone = Some("5550100200".to_string());
        assert_eq!(
            patient.validate(),
            Err(ValidationError::MissingField("emergency_contact_name"))
        );
        patient.emergency_contact_name = Some("Lina".to_string());
        assert!(patient.validate().is_ok());
    }

    #[test]
    fn missing_blood_type_defaults_to_unknown() {
        let value = serde_json::json!({
            "first_name": "A", "last_name": "B", "email": "a@b.io",
            "phone": "5550100200", "date_of_birth": "2001-01-01", "gender": 1
        });
        let patient: Patient = serde_json::from_value(value).unwrap();
        assert_eq!(patient.blood_type, BloodType::Unknown);
        assert_eq!(patient.gender, Gender::Female);
    }
}
