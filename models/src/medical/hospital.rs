// models/src/medical/hospital.rs

use serde::{Deserialize, Serialize};

use crate::document::Entity;
use crate::errors::{ValidationError, ValidationResult};
use crate::validation::{require, Validate};

/// A checkup package offered by a partner hospital. `description` is kept as
/// raw markdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HospitalCheckup {
    pub hospital_name: String,
    pub title: String,
    /// Price in minor currency units.
    pub price_cents: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_id: Option<String>,
}

impl Entity for HospitalCheckup {
    const COLLECTION: &'static str = "hospital_checkups";
}

impl HospitalCheckup {
    /// Price rendered as `units.cents`.
    pub fn display_price(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

impl Validate for HospitalCheckup {
    fn validate(&self) -> ValidationResult<()> {
        require("hospital_name", &self.hospital_name)?;
        require("title", &self.title)?;
        if self.price_cents < 0 {
            return Err(ValidationError::InvalidRange(format!(
                "price must not be negative, got {}",
                self.price_cents
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HospitalCheckup {
        HospitalCheckup {
            hospital_name: "St. Mary".to_string(),
            title: "Executive panel".to_string(),
            price_cents: 149_905,
            description: "## Includes\n- ECG\n- Blood panel".to_string(),
            image_id: None,
        }
    }

    #[test]
    fn price_formatting() {
        assert_eq!(sample().display_price(), "1499.05");
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut checkup = sample();
        checkup.price_cents = -1;
        assert!(matches!(checkup.validate(), Err(ValidationError::InvalidRange(_))));
        checkup.price_cents = 0;
        assert!(checkup.validate().is_ok());
    }
}
