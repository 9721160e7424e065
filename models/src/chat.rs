// models/src/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::document::Entity;
use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::DocumentId;
use crate::validation::Validate;

/// Longest message body accepted by `Message::new`.
pub const MAX_MESSAGE_LEN: usize = 4000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// Builds an unread message with a fresh id. Content is trimmed and must
    /// not be empty.
    pub fn new(sender_id: &DocumentId, content: &str) -> ValidationResult<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(ValidationError::InvalidRange(format!(
                "message longer than {} characters",
                MAX_MESSAGE_LEN
            )));
        }
        Ok(Message {
            id: DocumentId::unique().to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            is_read: false,
        })
    }
}

/// A two-party support conversation. The whole history is kept as a
/// JSON-encoded array in `messages`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub user_id: DocumentId,
    pub admin_id: DocumentId,
    #[serde(default = "empty_messages")]
    pub messages: String,
}

fn empty_messages() -> String {
    "[]".to_string()
}

impl Entity for Chat {
    const COLLECTION: &'static str = "chats";
}

impl Chat {
    pub fn new(user_id: DocumentId, admin_id: DocumentId) -> Self {
        Chat {
            user_id,
            admin_id,
            messages: empty_messages(),
        }
    }

    /// Deterministic id for the conversation between `user_id` and
    /// `admin_id`, so concurrent opens converge on one document.
    pub fn pair_id(user_id: &DocumentId, admin_id: &DocumentId) -> DocumentId {
        let name = format!("{}:{}", user_id, admin_id);
        let id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes());
        DocumentId::try_from(id.simple().to_string()).unwrap_or_else(|_| DocumentId::unique())
    }

    pub fn messages(&self) -> Vec<Message> {
        parse_messages(&self.messages)
    }

    pub fn set_messages(&mut self, messages: &[Message]) {
        self.messages = stringify_messages(messages);
    }

    pub fn is_participant(&self, id: &DocumentId) -> bool {
        &self.user_id == id || &self.admin_id == id
    }

    /// Number of messages from the other party that `reader` has not seen.
    pub fn unread_for(&self, reader: &DocumentId) -> usize {
        unread_count(&self.messages(), reader)
    }
}

impl Validate for Chat {
    fn validate(&self) -> ValidationResult<()> {
        if self.user_id == self.admin_id {
            return Err(ValidationError::InvalidRange(
                "a chat needs two distinct participants".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decodes a stored message list. Malformed JSON or a non-array payload
/// yields an empty list; array entries that do not decode are dropped.
pub fn parse_messages(raw: &str) -> Vec<Message> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("discarding malformed chat message list: {}", e);
            return Vec::new();
        }
    };
    let Value::Array(entries) = value else {
        warn!("chat message list is not an array, treating as empty");
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Message>(entry) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("skipping malformed chat message: {}", e);
                None
            }
        })
        .collect()
}

pub fn stringify_messages(messages: &[Message]) -> String {
    serde_json::to_string(messages).unwrap_or_else(|_| empty_messages())
}

pub fn unread_count(messages: &[Message], reader: &DocumentId) -> usize {
    messages
        .iter()
        .filter(|m| !m.is_read && m.sender_id != reader.as_str())
        .count()
}

/// Flags every message not sent by `reader` as read and returns how many
/// changed.
pub fn mark_read_by(messages: &mut [Message], reader: &DocumentId) -> usize {
    let mut changed = 0;
    for message in messages.iter_mut() {
        if !message.is_read && message.sender_id != reader.as_str() {
            message.is_read = true;
            changed += 1;
        }
    }
    changed
}
