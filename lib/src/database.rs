// lib/src/database.rs

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use models::errors::{ClinicError, ClinicResult};
use models::{Document, DocumentId, Entity, Stored, Validate};

use crate::config::AppConfig;
use crate::realtime::{ChangeEvent, ChangeKind, EventBus};
use crate::storage_engine::{open_document_store, DocumentStore, InMemoryStorage, Page, Query};

/// A document store paired with the event bus. Every successful mutation made
/// through a `Database` publishes exactly one change event.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    events: EventBus,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventBus) -> Self {
        Database { store, events }
    }

    pub fn open(config: &AppConfig) -> ClinicResult<Self> {
        let store = open_document_store(config)?;
        info!("Database ready on the {} engine", store.engine_type());
        Ok(Database::new(store, EventBus::new(config.storage.event_capacity)))
    }

    /// Fresh volatile database, mostly for tests.
    pub fn in_memory() -> Self {
        Database::new(Arc::new(InMemoryStorage::new()), EventBus::new(64))
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The raw store. Writes made here bypass change notifications.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn repository<T: Entity + Validate>(&self) -> Repository<T> {
        Repository {
            db: self.clone(),
            _marker: PhantomData,
        }
    }

    pub async fn create(
        &self,
        collection: &str,
        id: Option<DocumentId>,
        data: Value,
    ) -> ClinicResult<Document> {
        let document = self.store.create(collection, id, data).await?;
        debug!("created {}/{}", collection, document.id);
        self.events.publish(ChangeEvent::new(ChangeKind::Created, document.clone()));
        Ok(document)
    }

    pub async fn get(&self, collection: &str, id: &DocumentId) -> ClinicResult<Document> {
        self.store
            .get(collection, id)
            .await?
            .ok_or_else(|| ClinicError::not_found(collection, id.as_str()))
    }

    pub async fn find(&self, collection: &str, id: &DocumentId) -> ClinicResult<Option<Document>> {
        self.store.get(collection, id).await
    }

    pub async fn list(&self, collection: &str, query: &Query) -> ClinicResult<Page<Document>> {
        self.store.list(collection, query).await
    }

    pub async fn replace(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Value,
    ) -> ClinicResult<Document> {
        let document = self.store.replace(collection, id, data).await?;
        self.events.publish(ChangeEvent::new(ChangeKind::Updated, document.clone()));
        Ok(document)
    }

    pub async fn replace_if_revision(
        &self,
        collection: &str,
        id: &DocumentId,
        expected: u64,
        data: Value,
    ) -> ClinicResult<Document> {
        let document = self.store.replace_if_revision(collection, id, expected, data).await?;
        self.events.publish(ChangeEvent::new(ChangeKind::Updated, document.clone()));
        Ok(document)
    }

    pub async fn delete(&self, collection: &str, id: &DocumentId) -> ClinicResult<Document> {
        let document = self.store.delete(collection, id).await?;
        debug!("deleted {}/{}", collection, id);
        self.events.publish(ChangeEvent::new(ChangeKind::Deleted, document.clone()));
        Ok(document)
    }
}

/// Typed access to the collection of `T`. Records are validated before
/// every write.
pub struct Repository<T> {
    db: Database,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            db: self.db.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity + Validate> Repository<T> {
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn create(&self, record: &T) -> ClinicResult<Stored<T>> {
        self.create_with_id(None, record).await
    }

    pub async fn create_with_id(&self, id: Option<DocumentId>, record: &T) -> ClinicResult<Stored<T>> {
        record.validate()?;
        let document = self.db.create(T::COLLECTION, id, record.to_data()?).await?;
        Stored::from_document(&document)
    }

    pub async fn get(&self, id: &DocumentId) -> ClinicResult<Stored<T>> {
        Stored::from_document(&self.db.get(T::COLLECTION, id).await?)
    }

    pub async fn find(&self, id: &DocumentId) -> ClinicResult<Option<Stored<T>>> {
        self.db
            .find(T::COLLECTION, id)
            .await?
            .map(|doc| Stored::from_document(&doc))
            .transpose()
    }

    pub async fn list(&self, query: &Query) -> ClinicResult<Page<Stored<T>>> {
        self.db
            .list(T::COLLECTION, query)
            .await?
            .map(|doc| Stored::from_document(&doc))
    }

    /// Replaces the whole record.
    pub async fn update(&self, id: &DocumentId, record: &T) -> ClinicResult<Stored<T>> {
        record.validate()?;
        let document = self.db.replace(T::COLLECTION, id, record.to_data()?).await?;
        Stored::from_document(&document)
    }

    /// Replaces the record only if it is still at `revision`.
    pub async fn update_if_revision(
        &self,
        id: &DocumentId,
        revision: u64,
        record: &T,
    ) -> ClinicResult<Stored<T>> {
        record.validate()?;
        let document = self
            .db
            .replace_if_revision(T::COLLECTION, id, revision, record.to_data()?)
            .await?;
        Stored::from_document(&document)
    }

    pub async fn delete(&self, id: &DocumentId) -> ClinicResult<Stored<T>> {
        Stored::from_document(&self.db.delete(T::COLLECTION, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ValidationError;
    use models::medical::HospitalCheckup;

    fn checkup(title: &str, price_cents: i64) -> HospitalCheckup {
        HospitalCheckup {
            hospital_name: "St. Mary".to_string(),
            title: title.to_string(),
            price_cents,
            description: String::new(),
            image_id: None,
        }
    }

    #[tokio::test]
    async fn mutations_publish_events() {
        let db = Database::in_memory();
        let mut events = db.events().subscribe(HospitalCheckup::COLLECTION);
        let repo = db.repository::<HospitalCheckup>();

        let created = repo.create(&checkup("Basic", 5000)).await.unwrap();
        repo.update(&created.id, &checkup("Basic plus", 6000)).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        let kinds: Vec<ChangeKind> = vec![
            events.recv().await.unwrap().kind,
            events.recv().await.unwrap().kind,
            events.recv().await.unwrap().kind,
        ];
        assert_eq!(kinds, vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]);
    }

    #[tokio::test]
    async fn invalid_records_are_not_written() {
        let db = Database::in_memory();
        let repo = db.repository::<HospitalCheckup>();
        let err = repo.create(&checkup("", 100)).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(ValidationError::MissingField("title"))));
        assert_eq!(repo.list(&Query::new()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn typed_round_trip() {
        let db = Database::in_memory();
        let repo = db.repository::<HospitalCheckup>();
        let created = repo.create(&checkup("Cardio", 25_000)).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched.record, checkup("Cardio", 25_000));
        assert_eq!(fetched.revision, 1);

        let missing: DocumentId = "nothing".parse().unwrap();
        assert!(repo.get(&missing).await.unwrap_err().is_not_found());
        assert!(repo.find(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_update_is_rejected() {
        let db = Database::in_memory();
        let repo = db.repository::<HospitalCheckup>();
        let created = repo.create(&checkup("Cardio", 25_000)).await.unwrap();
        repo.update_if_revision(&created.id, 1, &checkup("Cardio", 26_000)).await.unwrap();
        let err = repo
            .update_if_revision(&created.id, 1, &checkup("Cardio", 27_000))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
