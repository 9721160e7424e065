// lib/src/storage_engine/inmemory_storage.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use models::errors::{ClinicError, ClinicResult};
use models::{Document, DocumentId};

use super::query::{Page, Query};
use super::storage_engine::DocumentStore;
use crate::config::StorageEngineType;

type Collection = BTreeMap<DocumentId, Document>;

/// Volatile store for tests and local development.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStorage {
    fn engine_type(&self) -> StorageEngineType {
        StorageEngineType::InMemory
    }

    async fn create(
        &self,
        collection: &str,
        id: Option<DocumentId>,
        data: Value,
    ) -> ClinicResult<Document> {
        let id = id.unwrap_or_else(DocumentId::unique);
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.contains_key(&id) {
            return Err(ClinicError::AlreadyExists(format!("{} document {}", collection, id)));
        }
        let document = Document::new(collection, id.clone(), data);
        documents.insert(id, document.clone());
        Ok(document)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> ClinicResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list(&self, collection: &str, query: &Query) -> ClinicResult<Page<Document>> {
        let collections = self.collections.read().await;
        let documents = collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(query.apply(documents))
    }

    async fn replace(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Value,
    ) -> ClinicResult<Document> {
        let mut collections = self.collections.write().await;
        let current = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| ClinicError::not_found(collection, id.as_str()))?;
        *current = current.next_revision(data);
        Ok(current.clone())
    }

    async fn replace_if_revision(
        &self,
        collection: &str,
        id: &DocumentId,
        expected: u64,
        data: Value,
    ) -> ClinicResult<Document> {
        let mut collections = self.collections.write().await;
        let current = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| ClinicError::not_found(collection, id.as_str()))?;
        if current.revision != expected {
            return Err(ClinicError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
                expected,
                found: current.revision,
            });
        }
        *current = current.next_revision(data);
        Ok(current.clone())
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> ClinicResult<Document> {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .ok_or_else(|| ClinicError::not_found(collection, id.as_str()))
    }
}
