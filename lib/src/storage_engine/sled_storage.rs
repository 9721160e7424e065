// lib/src/storage_engine/sled_storage.rs

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sled::{Db, IVec, Tree};
use tracing::{debug, info};

use models::errors::{ClinicError, ClinicResult};
use models::{Document, DocumentId};

use super::query::{Page, Query};
use super::storage_engine::DocumentStore;
use crate::config::StorageEngineType;

/// Persistent store keeping one sled tree per collection, documents encoded
/// as JSON and keyed by id.
#[derive(Debug, Clone)]
pub struct SledStorage {
    db: Db,
}

impl SledStorage {
    pub fn open(path: &Path) -> ClinicResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            ClinicError::StorageError(format!(
                "Failed to create database directory at {:?}: {}",
                path, e
            ))
        })?;
        let db = sled::Config::new().path(path).open().map_err(|e| {
            ClinicError::StorageError(format!("Failed to open Sled database at {:?}: {}", path, e))
        })?;
        info!("Opened Sled database at {:?}", path);
        Ok(SledStorage { db })
    }

    /// Wraps an already opened database, e.g. a temporary one in tests.
    pub fn from_db(db: Db) -> Self {
        SledStorage { db }
    }

    fn tree(&self, collection: &str) -> ClinicResult<Tree> {
        Ok(self.db.open_tree(collection)?)
    }
}

fn encode(document: &Document) -> ClinicResult<Vec<u8>> {
    Ok(serde_json::to_vec(document)?)
}

fn decode(bytes: &IVec) -> ClinicResult<Document> {
    serde_json::from_slice(bytes)
        .map_err(|e| ClinicError::SerializationError(format!("corrupt document record: {}", e)))
}

#[async_trait]
impl DocumentStore for SledStorage {
    fn engine_type(&self) -> StorageEngineType {
        StorageEngineType::Sled
    }

    async fn create(
        &self,
        collection: &str,
        id: Option<DocumentId>,
        data: Value,
    ) -> ClinicResult<Document> {
        let tree = self.tree(collection)?;
        let id = id.unwrap_or_else(DocumentId::unique);
        let document = Document::new(collection, id.clone(), data);
        let swapped = tree.compare_and_swap(id.as_bytes(), None::<&[u8]>, Some(encode(&document)?))?;
        if swapped.is_err() {
            return Err(ClinicError::AlreadyExists(format!("{} document {}", collection, id)));
        }
        Ok(document)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> ClinicResult<Option<Document>> {
        let tree = self.tree(collection)?;
        tree.get(id.as_bytes())?.as_ref().map(decode).transpose()
    }

    async fn list(&self, collection: &str, query: &Query) -> ClinicResult<Page<Document>> {
        let tree = self.tree(collection)?;
        let mut documents = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_key, value) = item?;
            documents.push(decode(&value)?);
        }
        Ok(query.apply(documents))
    }

    async fn replace(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Value,
    ) -> ClinicResult<Document> {
        let tree = self.tree(collection)?;
        // Unconditional for the caller; the swap only guards the revision counter.
        loop {
            let raw = tree
                .get(id.as_bytes())?
                .ok_or_else(|| ClinicError::not_found(collection, id.as_str()))?;
            let next = decode(&raw)?.next_revision(data.clone());
            if tree
                .compare_and_swap(id.as_bytes(), Some(&raw), Some(encode(&next)?))?
                .is_ok()
            {
                return Ok(next);
            }
            debug!("retrying overwrite of {}/{} after concurrent write", collection, id);
        }
    }

    async fn replace_if_revision(
        &self,
        collection: &str,
        id: &DocumentId,
        expected: u64,
        data: Value,
    ) -> ClinicResult<Document> {
        let tree = self.tree(collection)?;
        let raw = tree
            .get(id.as_bytes())?
            .ok_or_else(|| ClinicError::not_found(collection, id.as_str()))?;
        let current = decode(&raw)?;
        let conflict = |found: u64| ClinicError::Conflict {
            collection: collection.to_string(),
            id: id.to_string(),
            expected,
            found,
        };
        if current.revision != expected {
            return Err(conflict(current.revision));
        }
        let next = current.next_revision(data);
        match tree.compare_and_swap(id.as_bytes(), Some(&raw), Some(encode(&next)?))? {
            Ok(()) => Ok(next),
            Err(cas) => {
                let found = match cas.current {
                    Some(bytes) => decode(&bytes)?.revision,
                    None => return Err(ClinicError::not_found(collection, id.as_str())),
                };
                Err(conflict(found))
            }
        }
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> ClinicResult<Document> {
        let tree = self.tree(collection)?;
        let removed = tree
            .remove(id.as_bytes())?
            .ok_or_else(|| ClinicError::not_found(collection, id.as_str()))?;
        decode(&removed)
    }

    async fn flush(&self) -> ClinicResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}
