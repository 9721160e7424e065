// lib/src/lib.rs

pub mod chat;
pub mod config;
pub mod database;
pub mod filters;
pub mod import;
pub mod realtime;
pub mod scheduling;
pub mod storage_engine;

pub use chat::{ChatService, ChatSummary, ChatWatcher};
pub use config::{load_config, AppConfig, StorageEngineType};
pub use database::{Database, Repository};
pub use filters::{AppointmentFilter, CheckupFilter, DoctorFilter, PatientFilter};
pub use import::{import_doctors_csv, ImportReport, RowError};
pub use realtime::{ChangeEvent, ChangeKind, EventBus, RevisionGate, Subscription};
pub use scheduling::AppointmentBook;
pub use storage_engine::{DocumentStore, FileStore, Page, Query, SortOrder, StoredFile};
