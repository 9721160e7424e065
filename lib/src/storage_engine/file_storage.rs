// lib/src/storage_engine/file_storage.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

use models::errors::{ClinicError, ClinicResult, ValidationError};
use models::DocumentId;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: DocumentId,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    async fn upload(&self, name: &str, mime_type: &str, content: Bytes) -> ClinicResult<StoredFile>;

    async fn metadata(&self, id: &DocumentId) -> ClinicResult<StoredFile>;

    async fn download(&self, id: &DocumentId) -> ClinicResult<(StoredFile, Bytes)>;

    async fn delete(&self, id: &DocumentId) -> ClinicResult<()>;
}

const FILES: &str = "files";

/// Checks an upload against the size limit and builds its metadata. Only the
/// last path component of `name` is kept.
fn prepare_upload(name: &str, mime_type: &str, size: usize, limit: usize) -> ClinicResult<StoredFile> {
    if size > limit {
        return Err(ClinicError::PayloadTooLarge { size, limit });
    }
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("file name").into());
    }
    let mime_type = match mime_type.trim() {
        "" => DEFAULT_MIME_TYPE.to_string(),
        other => other.to_string(),
    };
    Ok(StoredFile {
        id: DocumentId::unique(),
        name: name.to_string(),
        mime_type,
        size,
        created_at: Utc::now(),
    })
}

#[derive(Debug, Clone)]
pub struct InMemoryFileStore {
    files: Arc<RwLock<HashMap<DocumentId, (StoredFile, Bytes)>>>,
    max_upload_bytes: usize,
}

impl InMemoryFileStore {
    pub fn new(max_upload_bytes: usize) -> Self {
        InMemoryFileStore {
            files: Arc::new(RwLock::new(HashMap::new())),
            max_upload_bytes,
        }
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn upload(&self, name: &str, mime_type: &str, content: Bytes) -> ClinicResult<StoredFile> {
        let file = prepare_upload(name, mime_type, content.len(), self.max_upload_bytes)?;
        self.files.write().await.insert(file.id.clone(), (file.clone(), content));
        Ok(file)
    }

    async fn metadata(&self, id: &DocumentId) -> ClinicResult<StoredFile> {
        self.download(id).await.map(|(file, _)| file)
    }

    async fn download(&self, id: &DocumentId) -> ClinicResult<(StoredFile, Bytes)> {
        self.files
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ClinicError::not_found(FILES, id.as_str()))
    }

    async fn delete(&self, id: &DocumentId) -> ClinicResult<()> {
        self.files
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ClinicError::not_found(FILES, id.as_str()))
    }
}

/// Keeps each upload as `<id>.bin` with a `<id>.json` metadata sidecar.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    max_upload_bytes: usize,
}

impl LocalFileStore {
    pub async fn open(root: &Path, max_upload_bytes: usize) -> ClinicResult<Self> {
        fs::create_dir_all(root).await?;
        info!("Serving uploaded files from {:?}", root);
        Ok(LocalFileStore {
            root: root.to_path_buf(),
            max_upload_bytes,
        })
    }

    fn content_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}.bin", id))
    }

    fn metadata_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn upload(&self, name: &str, mime_type: &str, content: Bytes) -> ClinicResult<StoredFile> {
        let file = prepare_upload(name, mime_type, content.len(), self.max_upload_bytes)?;
        fs::write(self.content_path(&file.id), &content).await?;
        // A readable sidecar implies complete content.
        fs::write(self.metadata_path(&file.id), serde_json::to_vec(&file)?).await?;
        Ok(file)
    }

    async fn metadata(&self, id: &DocumentId) -> ClinicResult<StoredFile> {
        match fs::read(self.metadata_path(id)).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ClinicError::not_found(FILES, id.as_str()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn download(&self, id: &DocumentId) -> ClinicResult<(StoredFile, Bytes)> {
        let file = self.metadata(id).await?;
        let content = fs::read(self.content_path(id)).await?;
        Ok((file, Bytes::from(content)))
    }

    async fn delete(&self, id: &DocumentId) -> ClinicResult<()> {
        self.metadata(id).await?;
        // Reverse of upload: content, then sidecar.
        match fs::remove_file(self.content_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("file {} had no content on disk", id);
            }
            Err(e) => return Err(e.into()),
        }
        fs::remove_file(self.metadata_path(id)).await?;
        Ok(())
    }
}
