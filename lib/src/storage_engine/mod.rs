// lib/src/storage_engine/mod.rs

pub mod file_storage;
pub mod inmemory_storage;
pub mod query;
pub mod sled_storage;
pub mod storage_engine;


use std::sync::Arc;

use tracing::info;

use models::errors::ClinicResult;

use crate::config::{AppConfig, StorageEngineType};
pub use file_storage::{FileStore, InMemoryFileStore, LocalFileStore, StoredFile};
pub use inmemory_storage::InMemoryStorage;
pub use query::{Filter, Page, Query, SortOrder};
pub use sled_storage::SledStorage;
pub use storage_engine::DocumentStore;

/// Opens the document store selected by the configuration.
pub fn open_document_store(config: &AppConfig) -> ClinicResult<Arc<dyn DocumentStore>> {
    info!("Opening {} document store", config.storage.engine);
    Ok(match config.storage.engine {
        StorageEngineType::InMemory => Arc::new(InMemoryStorage::new()),
        StorageEngineType::Sled => Arc::new(SledStorage::open(&config.storage.sled_path())?),
    })
}

/// Opens the file store matching the configured engine: volatile with the
/// in-memory engine, on disk next to the sled data otherwise.
pub async fn open_file_store(config: &AppConfig) -> ClinicResult<Arc<dyn FileStore>> {
    let limit = config.files.max_upload_bytes;
    Ok(match config.storage.engine {
        StorageEngineType::InMemory => Arc::new(InMemoryFileStore::new(limit)),
        StorageEngineType::Sled => {
            Arc::new(LocalFileStore::open(&config.storage.files_path(), limit).await?)
        }
    })
}
