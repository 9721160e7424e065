// models/src/document.rs

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ClinicError, ClinicResult};
use crate::identifiers::DocumentId;

/// A schema-flexible record as held by the document store.
///
/// `revision` starts at 1 and is bumped on every write. Writers that want to
/// detect concurrent modification compare it before replacing the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub collection: String,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: Value,
}

impl Document {
    pub fn new(collection: &str, id: DocumentId, data: Value) -> Self {
        let now = Utc::now();
        Document {
            id,
            collection: collection.to_string(),
            revision: 1,
            created_at: now,
            updated_at: now,
            data,
        }
    }

    /// Returns the next revision of this document carrying `data`.
    pub fn next_revision(&self, data: Value) -> Self {
        Document {
            id: self.id.clone(),
            collection: self.collection.clone(),
            revision: self.revision + 1,
            created_at: self.created_at,
            updated_at: Utc::now(),
            data,
        }
    }

    /// Looks up a top-level field of the payload.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// A record type that lives in a fixed collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn to_data(&self) -> ClinicResult<Value> {
        let data = serde_json::to_value(self)?;
        if !data.is_object() {
            return Err(ClinicError::SerializationError(format!(
                "{} records must serialize to a JSON object",
                Self::COLLECTION
            )));
        }
        Ok(data)
    }

    fn from_data(data: &Value) -> ClinicResult<Self> {
        serde_json::from_value(data.clone()).map_err(|e| {
            ClinicError::SerializationError(format!(
                "malformed {} document: {}",
                Self::COLLECTION,
                e
            ))
        })
    }
}

/// A typed record together with its document metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: DocumentId,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: T,
}

impl<T: Entity> Stored<T> {
    pub fn from_document(document: &Document) -> ClinicResult<Self> {
        if document.collection != T::COLLECTION {
            return Err(ClinicError::InvalidData(format!(
                "document {} belongs to {}, not {}",
                document.id,
                document.collection,
                T::COLLECTION
            )));
        }
        Ok(Stored {
            id: document.id.clone(),
            revision: document.revision,
            created_at: document.created_at,
            updated_at: document.updated_at,
            record: T::from_data(&document.data)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Entity for Note {
        const COLLECTION: &'static str = "notes";
    }

    #[test]
    fn next_revision_bumps_counter_and_keeps_identity() {
        let doc = Document::new("notes", DocumentId::unique(), json!({"text": "a"}));
        let next = doc.next_revision(json!({"text": "b"}));
        assert_eq!(next.revision, 2);
        assert_eq!(next.id, doc.id);
        assert_eq!(next.created_at, doc.created_at);
        assert_eq!(next.field("text"), Some(&json!("b")));
    }

    #[test]
    fn stored_flattens_record_fields() {
        let doc = Document::new("notes", DocumentId::unique(), json!({"text": "hello"}));
        let stored = Stored::<Note>::from_document(&doc).unwrap();
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["text"], "hello");
        assert_eq!(value["revision"], 1);
    }

    #[test]
    fn stored_rejects_foreign_collection() {
        let doc = Document::new("other", DocumentId::unique(), json!({"text": "x"}));
        assert!(matches!(
            Stored::<Note>::from_document(&doc),
            Err(ClinicError::InvalidData(_))
        ));
    }
}
