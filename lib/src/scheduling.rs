// lib/src/scheduling.rs

use chrono::Duration;
use serde_json::json;
use tracing::info;

use models::errors::{ClinicError, ClinicResult};
use models::medical::{Appointment, AppointmentDuration};
use models::labels::Labeled;
use models::{DocumentId, Stored};

use crate::database::{Database, Repository};
use crate::storage_engine::Query;

/// Appointment writes that refuse to double-book a doctor.
#[derive(Clone)]
pub struct AppointmentBook {
    appointments: Repository<Appointment>,
}

fn longest_slot() -> Duration {
    let minutes = AppointmentDuration::ALL.iter().map(|d| d.minutes()).max().unwrap_or(0);
    Duration::minutes(minutes)
}

impl AppointmentBook {
    pub fn new(db: &Database) -> Self {
        AppointmentBook {
            appointments: db.repository::<Appointment>(),
        }
    }

    pub fn repository(&self) -> &Repository<Appointment> {
        &self.appointments
    }

    /// Appointments of the same doctor whose slots intersect `candidate`,
    /// ignoring the document `exclude`.
    pub async fn conflicts(
        &self,
        candidate: &Appointment,
        exclude: Option<&DocumentId>,
    ) -> ClinicResult<Vec<Stored<Appointment>>> {
        // Anything starting before this cannot reach into the candidate slot.
        let earliest = candidate.scheduled_at - longest_slot();
        let query = Query::new()
            .equal("doctor_id", candidate.doctor_id.as_str())
            .range(
                "scheduled_at",
                Some(json!(earliest)),
                Some(json!(candidate.ends_at())),
            );
        let page = self.appointments.list(&query).await?;
        Ok(page
            .items
            .into_iter()
            .filter(|existing| Some(&existing.id) != exclude)
            .filter(|existing| existing.record.overlaps(candidate))
            .collect())
    }

    pub async fn book(&self, appointment: &Appointment) -> ClinicResult<Stored<Appointment>> {
        self.ensure_free(appointment, None).await?;
        let stored = self.appointments.create(appointment).await?;
        info!(
            "Booked appointment {} with doctor {} at {}",
            stored.id, appointment.doctor_id, appointment.scheduled_at
        );
        Ok(stored)
    }

    pub async fn reschedule(&self, id: &DocumentId, appointment: &Appointment) -> ClinicResult<Stored<Appointment>> {
        self.appointments.get(id).await?;
        self.ensure_free(appointment, Some(id)).await?;
        self.appointments.update(id, appointment).await
    }

    async fn ensure_free(&self, appointment: &Appointment, exclude: Option<&DocumentId>) -> ClinicResult<()> {
        match self.conflicts(appointment, exclude).await?.first() {
            Some(clash) => Err(ClinicError::AlreadyExists(format!(
                "doctor {} is already booked from {} to {} (appointment {})",
                appointment.doctor_id,
                clash.record.scheduled_at,
                clash.record.ends_at(),
                clash.id
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use models::medical::{AppointmentPriority, AppointmentStatus, AppointmentType};

    fn appointment(doctor: &str, hour: u32, minute: u32, duration: AppointmentDuration) -> Appointment {
        Appointment {
            patient_id: "p1".parse().unwrap(),
            doctor_id: doctor.parse().unwrap(),
            scheduled_at: Utc.with_ymd_and_hms(2026, 5, 4, hour, minute, 0).unwrap(),
            appointment_type: AppointmentType::Consultation,
            priority: AppointmentPriority::Normal,
            duration,
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn overlapping_booking_is_refused() {
        let book = AppointmentBook::new(&Database::in_memory());
        book.book(&appointment("d1", 9, 0, AppointmentDuration::Minutes90)).await.unwrap();

        let clash = book.book(&appointment("d1", 10, 0, AppointmentDuration::Minutes15)).await;
        assert!(matches!(clash, Err(ClinicError::AlreadyExists(_))));

        // Back to back and other doctors are fine.
        book.book(&appointment("d1", 10, 30, AppointmentDuration::Minutes30)).await.unwrap();
        book.book(&appointment("d2", 9, 30, AppointmentDuration::Minutes30)).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_slots_can_be_rebooked() {
        let book = AppointmentBook::new(&Database::in_memory());
        let mut first = appointment("d1", 14, 0, AppointmentDuration::Minutes60);
        let stored = book.book(&first).await.unwrap();
        first.status = AppointmentStatus::Cancelled;
        book.reschedule(&stored.id, &first).await.unwrap();
        book.book(&appointment("d1", 14, 15, AppointmentDuration::Minutes30)).await.unwrap();
    }

    #[tokio::test]
    async fn rescheduling_ignores_itself() {
        let book = AppointmentBook::new(&Database::in_memory());
        let stored = book.book(&appointment("d1", 8, 0, AppointmentDuration::Minutes60)).await.unwrap();
        let moved = appointment("d1", 8, 30, AppointmentDuration::Minutes60);
        let updated = book.reschedule(&stored.id, &moved).await.unwrap();
        assert_eq!(updated.record.scheduled_at, moved.scheduled_at);

        let missing: DocumentId = "nope".parse().unwrap();
        assert!(book.reschedule(&missing, &moved).await.unwrap_err().is_not_found());
    }
}
