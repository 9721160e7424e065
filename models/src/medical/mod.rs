// models/src/medical/mod.rs

pub mod appointment;
pub mod doctor;
pub mod hospital;
pub mod patient;
pub mod user;

pub use appointment::{
    Appointment, AppointmentDuration, AppointmentPriority, AppointmentStatus, AppointmentType,
};
pub use doctor::{DaySchedule, Department, Doctor, NewDoctor, Specialty, WorkingHours};
pub use hospital::HospitalCheckup;
pub use patient::{BloodType, Gender, Patient};
pub use user::{Login, NewUser, PublicUser, Role, User};
