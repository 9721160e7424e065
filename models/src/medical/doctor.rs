// models/src/medical/doctor.rs

use serde::{Deserialize, Serialize};

use crate::document::Entity;
use crate::errors::{ClinicError, ClinicResult, ValidationError, ValidationResult};
use crate::validation::{parse_time_of_day, require, validate_email, validate_phone, Validate};

crate::labeled_enum! {
    pub enum Specialty ("specialty") {
        GeneralPractice = 0 => "General Practice",
        Cardiology = 1 => "Cardiology",
        Dermatology = 2 => "Dermatology",
        Pediatrics = 3 => "Pediatrics",
        Neurology = 4 => "Neurology",
        Orthopedics = 5 => "Orthopedics",
        Gynecology = 6 => "Gynecology",
        Ophthalmology = 7 => "Ophthalmology",
        Psychiatry = 8 => "Psychiatry",
        Oncology = 9 => "Oncology",
        Radiology = 10 => "Radiology",
        Otolaryngology = 11 => "Otolaryngology (ENT)",
    }
}

crate::labeled_enum! {
    pub enum Department ("department") {
        Outpatient = 0 => "Outpatient",
        Inpatient = 1 => "Inpatient",
        Emergency = 2 => "Emergency",
        Surgery = 3 => "Surgery",
        Diagnostics = 4 => "Diagnostics",
        IntensiveCare = 5 => "Intensive Care",
        Rehabilitation = 6 => "Rehabilitation",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub start: String,
    pub end: String,
    pub is_available: bool,
}

impl DaySchedule {
    pub fn open(start: &str, end: &str) -> Self {
        DaySchedule {
            start: start.to_string(),
            end: end.to_string(),
            is_available: true,
        }
    }

    pub fn closed() -> Self {
        DaySchedule {
            start: "00:00".to_string(),
            end: "00:00".to_string(),
            is_available: false,
        }
    }
}

/// Weekly availability of a doctor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

impl Default for WorkingHours {
    fn default() -> Self {
        WorkingHours {
            monday: DaySchedule::open("09:00", "17:00"),
            tuesday: DaySchedule::open("09:00", "17:00"),
            wednesday: DaySchedule::open("09:00", "17:00"),
            thursday: DaySchedule::open("09:00", "17:00"),
            friday: DaySchedule::open("09:00", "17:00"),
            saturday: DaySchedule::closed(),
            sunday: DaySchedule::closed(),
        }
    }
}

impl WorkingHours {
    pub fn days(&self) -> [(&'static str, &DaySchedule); 7] {
        [
            ("monday", &self.monday),
            ("tuesday", &self.tuesday),
            ("wednesday", &self.wednesday),
            ("thursday", &self.thursday),
            ("friday", &self.friday),
            ("saturday", &self.saturday),
            ("sunday", &self.sunday),
        ]
    }
}

impl Validate for WorkingHours {
    fn validate(&self) -> ValidationResult<()> {
        for (day, schedule) in self.days() {
            if !schedule.is_available {
                continue;
            }
            let start = parse_time_of_day(&schedule.start)?;
            let end = parse_time_of_day(&schedule.end)?;
            if start >= end {
                return Err(ValidationError::InvalidRange(format!(
                    "{} starts at {} but ends at {}",
                    day, schedule.start, schedule.end
                )));
            }
        }
        Ok(())
    }
}

/// A doctor as stored. `languages` and `working_hours` hold JSON text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specialty: Specialty,
    pub department: Department,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub experience_years: u16,
    #[serde(default = "empty_list")]
    pub languages: String,
    pub working_hours: String,
}

fn empty_list() -> String {
    "[]".to_string()
}

impl Entity for Doctor {
    const COLLECTION: &'static str = "doctors";
}

impl Doctor {
    /// Decoded language list; malformed text yields an empty list.
    pub fn languages(&self) -> Vec<String> {
        serde_json::from_str(&self.languages).unwrap_or_default()
    }

    pub fn set_languages(&mut self, languages: &[String]) -> ClinicResult<()> {
        self.languages = serde_json::to_string(languages)?;
        Ok(())
    }

    pub fn working_hours(&self) -> ClinicResult<WorkingHours> {
        serde_json::from_str(&self.working_hours).map_err(|e| {
            ClinicError::SerializationError(format!("malformed working hours: {}", e))
        })
    }

    pub fn set_working_hours(&mut self, hours: &WorkingHours) -> ClinicResult<()> {
        hours.validate()?;
        self.working_hours = serde_json::to_string(hours)?;
        Ok(())
    }
}

impl Validate for Doctor {
    fn validate(&self) -> ValidationResult<()> {
        require("name", &self.name)?;
        validate_email(&self.email)?;
        validate_phone(&self.phone)?;
        let hours: WorkingHours = serde_json::from_str(&self.working_hours)
            .map_err(|_| ValidationError::InvalidRange("working_hours is not valid".to_string()))?;
        hours.validate()
    }
}

/// Doctor input with the nested fields in typed form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specialty: Specialty,
    pub department: Department,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub experience_years: u16,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub working_hours: WorkingHours,
}

impl NewDoctor {
    /// Validates the input and encodes it into its stored shape.
    pub fn into_doctor(self) -> ClinicResult<Doctor> {
        self.working_hours.validate()?;
        let doctor = Doctor {
            languages: serde_json::to_string(&self.languages)?,
            working_hours: serde_json::to_string(&self.working_hours)?,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            specialty: self.specialty,
            department: self.department,
            bio: self.bio,
            image_id: self.image_id,
            experience_years: self.experience_years,
        };
        doctor.validate()?;
        Ok(doctor)
    }
}
