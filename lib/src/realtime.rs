// lib/src/realtime.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

use models::{Document, DocumentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One document mutation. For deletions `document` is the last stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub collection: String,
    pub document_id: DocumentId,
    pub document: Document,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, document: Document) -> Self {
        ChangeEvent {
            kind,
            collection: document.collection.clone(),
            document_id: document.id.clone(),
            document,
            at: Utc::now(),
        }
    }
}

/// Fan-out of change events to any number of subscribers. Publishing never
/// blocks; a subscriber that falls behind by more than the channel capacity
/// skips the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        trace!(
            "publishing {:?} for {}/{}",
            event.kind,
            event.collection,
            event.document_id
        );
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Every event of every collection.
    pub fn subscribe_all(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            collection: None,
            document_id: None,
        }
    }

    pub fn subscribe(&self, collection: &str) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            collection: Some(collection.to_string()),
            document_id: None,
        }
    }

    pub fn subscribe_document(&self, collection: &str, id: DocumentId) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            collection: Some(collection.to_string()),
            document_id: Some(id),
        }
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    collection: Option<String>,
    document_id: Option<DocumentId>,
}

impl Subscription {
    fn wants(&self, event: &ChangeEvent) -> bool {
        self.collection.as_ref().map_or(true, |c| c == &event.collection)
            && self.document_id.as_ref().map_or(true, |id| id == &event.document_id)
    }

    /// Waits for the next matching event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("realtime subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Tracks the newest revision of one document a consumer has applied.
///
/// Writers publish after their store commit, so concurrent writers can
/// deliver events out of revision order. The gate admits an event only when
/// it is newer than the last one admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionGate {
    revision: u64,
    deleted: bool,
}

impl RevisionGate {
    pub fn new(revision: u64) -> Self {
        RevisionGate { revision, deleted: false }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns whether `event` should be applied, recording it if so.
    pub fn admit(&mut self, event: &ChangeEvent) -> bool {
        let revision = event.document.revision;
        let admitted = match event.kind {
            ChangeKind::Created => self.deleted || revision > self.revision,
            ChangeKind::Updated => !self.deleted && revision > self.revision,
            ChangeKind::Deleted => !self.deleted && revision >= self.revision,
        };
        if !admitted {
            trace!(
                "dropping stale {:?} rev {} of {} (at rev {})",
                event.kind,
                revision,
                event.document_id,
                self.revision
            );
            return false;
        }
        if event.kind == ChangeKind::Deleted {
            self.mark_deleted();
        } else {
            self.observe(&event.document);
        }
        true
    }

    /// Records a state read directly from the store.
    pub fn observe(&mut self, document: &Document) {
        self.revision = document.revision;
        self.deleted = false;
    }

    pub fn mark_deleted(&mut self) {
        self.revision = 0;
        self.deleted = true;
    }
}
