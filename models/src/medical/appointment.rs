// models/src/medical/appointment.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Entity;
use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::DocumentId;
use crate::validation::Validate;

crate::labeled_enum! {
    pub enum AppointmentType ("appointment type") {
        Consultation = 0 => "Consultation",
        FollowUp = 1 => "Follow-up",
        Checkup = 2 => "Checkup",
        Procedure = 3 => "Procedure",
        Emergency = 4 => "Emergency",
        Telehealth = 5 => "Telehealth",
    }
}

crate::labeled_enum! {
    pub enum AppointmentPriority ("appointment priority") {
        Low = 0 => "Low",
        Normal = 1 => "Normal",
        High = 2 => "High",
        Urgent = 3 => "Urgent",
    }
}

crate::labeled_enum! {
    pub enum AppointmentDuration ("appointment duration") {
        Minutes15 = 0 => "15 minutes",
        Minutes30 = 1 => "30 minutes",
        Minutes45 = 2 => "45 minutes",
        Minutes60 = 3 => "1 hour",
        Minutes90 = 4 => "1.5 hours",
    }
}

crate::labeled_enum! {
    pub enum AppointmentStatus ("appointment status") {
        Scheduled = 0 => "Scheduled",
        Confirmed = 1 => "Confirmed",
        Completed = 2 => "Completed",
        Cancelled = 3 => "Cancelled",
        NoShow = 4 => "No-show",
    }
}

impl AppointmentDuration {
    pub fn minutes(self) -> i64 {
        match self {
            AppointmentDuration::Minutes15 => 15,
            AppointmentDuration::Minutes30 => 30,
            AppointmentDuration::Minutes45 => 45,
            AppointmentDuration::Minutes60 => 60,
            AppointmentDuration::Minutes90 => 90,
        }
    }
}

fn scheduled() -> AppointmentStatus {
    AppointmentStatus::Scheduled
}

fn normal_priority() -> AppointmentPriority {
    AppointmentPriority::Normal
}

/// Patient and doctor ids are plain references; nothing checks that they
/// point at existing documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub patient_id: DocumentId,
    pub doctor_id: DocumentId,
    pub scheduled_at: DateTime<Utc>,
    pub appointment_type: AppointmentType,
    #[serde(default = "normal_priority")]
    pub priority: AppointmentPriority,
    pub duration: AppointmentDuration,
    #[serde(default = "scheduled")]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Entity for Appointment {
    const COLLECTION: &'static str = "appointments";
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(self.duration.minutes())
    }

    /// True when the two appointments share a doctor and their time slots
    /// intersect. Cancelled appointments never overlap.
    pub fn overlaps(&self, other: &Appointment) -> bool {
        if self.status == AppointmentStatus::Cancelled || other.status == AppointmentStatus::Cancelled {
            return false;
        }
        self.doctor_id == other.doctor_id
            && self.scheduled_at < other.ends_at()
            && other.scheduled_at < self.ends_at()
    }
}

/// Longest free-text reason or note kept on an appointment.
pub const MAX_NOTE_LEN: usize = 2000;

impl Validate for Appointment {
    fn validate(&self) -> ValidationResult<()> {
        for (field, text) in [("reason", &self.reason), ("notes", &self.notes)] {
            if text.as_ref().is_some_and(|t| t.chars().count() > MAX_NOTE_LEN) {
                return Err(ValidationError::InvalidRange(format!(
                    "{} is longer than {} characters",
                    field, MAX_NOTE_LEN
                )));
            }
        }
        Ok(())
    }
}
