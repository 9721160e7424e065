// rest_api/src/state.rs

use std::sync::Arc;

use tracing::info;

use lib::config::AppConfig;
use lib::storage_engine::{open_file_store, FileStore, InMemoryFileStore};
use lib::{AppointmentBook, ChatService, Database};
use models::errors::ClinicResult;
use security::{TokenIssuer, UserService};

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub files: Arc<dyn FileStore>,
    pub chats: ChatService,
    pub users: UserService,
    pub appointments: AppointmentBook,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, files: Arc<dyn FileStore>) -> Self {
        AppState {
            chats: ChatService::new(&db, &config.chat),
            users: UserService::new(&db, TokenIssuer::from_config(&config.auth)),
            appointments: AppointmentBook::new(&db),
            config: Arc::new(config),
            db,
            files,
        }
    }

    /// Opens the stores selected by `config` and creates the bootstrap
    /// administrator when one is configured.
    pub async fn open(config: AppConfig) -> ClinicResult<Self> {
        let db = Database::open(&config)?;
        let files = open_file_store(&config).await?;
        let state = AppState::new(config, db, files);
        if let (Some(email), Some(password)) =
            (&state.config.auth.admin_email, &state.config.auth.admin_password)
        {
            let admin = state.users.ensure_admin(email, password).await?;
            info!("Administrator account {} is ready", admin.id);
        }
        Ok(state)
    }

    /// Volatile state for tests and demos.
    pub fn in_memory(config: AppConfig) -> Self {
        let files = Arc::new(InMemoryFileStore::new(config.files.max_upload_bytes));
        AppState::new(config, Database::in_memory(), files)
    }
}
