// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;
use serde_json::Value;

use models::errors::ClinicResult;
use models::{Document, DocumentId};

use super::query::{Page, Query};
use crate::config::StorageEngineType;

/// The document primitives the application needs from its backend.
///
/// `replace` is an unconditional last-writer-wins overwrite.
/// `replace_if_revision` only writes when the stored revision still equals
/// `expected` and otherwise fails with `ClinicError::Conflict`; it is the
/// building block for lossless read-modify-write cycles.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    fn engine_type(&self) -> StorageEngineType;

    /// Creates a document. A `None` id generates one; an id that is already
    /// taken fails with `ClinicError::AlreadyExists`.
    async fn create(
        &self,
        collection: &str,
        id: Option<DocumentId>,
        data: Value,
    ) -> ClinicResult<Document>;

    async fn get(&self, collection: &str, id: &DocumentId) -> ClinicResult<Option<Document>>;

    async fn list(&self, collection: &str, query: &Query) -> ClinicResult<Page<Document>>;

    async fn replace(&self, collection: &str, id: &DocumentId, data: Value)
        -> ClinicResult<Document>;

    async fn replace_if_revision(
        &self,
        collection: &str,
        id: &DocumentId,
        expected: u64,
        data: Value,
    ) -> ClinicResult<Document>;

    /// Removes a document and returns its last state.
    async fn delete(&self, collection: &str, id: &DocumentId) -> ClinicResult<Document>;

    async fn flush(&self) -> ClinicResult<()> {
        Ok(())
    }
}
