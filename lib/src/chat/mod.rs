// lib/src/chat/mod.rs

pub mod watcher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use models::chat::{mark_read_by, unread_count};
use models::errors::{ClinicError, ClinicResult};
use models::{Chat, DocumentId, Entity, Message, Stored};

use crate::config::ChatConfig;
use crate::database::{Database, Repository};
use crate::storage_engine::{Query, SortOrder};

pub use watcher::ChatWatcher;

/// A conversation as seen by one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: DocumentId,
    pub user_id: DocumentId,
    pub admin_id: DocumentId,
    pub last_message: Option<Message>,
    pub message_count: usize,
    pub unread: usize,
    pub updated_at: DateTime<Utc>,
}

impl ChatSummary {
    fn for_viewer(chat: &Stored<Chat>, viewer: &DocumentId) -> Self {
        let messages = chat.record.messages();
        ChatSummary {
            id: chat.id.clone(),
            user_id: chat.record.user_id.clone(),
            admin_id: chat.record.admin_id.clone(),
            unread: unread_count(&messages, viewer),
            message_count: messages.len(),
            last_message: messages.last().cloned(),
            updated_at: chat.updated_at,
        }
    }
}

/// Support chat operations. Every change to a message list is a
/// read-modify-write guarded by the document revision: when another writer
/// got in first the cycle restarts from a fresh read, so concurrent sends
/// never overwrite each other.
#[derive(Clone)]
pub struct ChatService {
    chats: Repository<Chat>,
    max_retries: u32,
}

impl ChatService {
    pub fn new(db: &Database, config: &ChatConfig) -> Self {
        ChatService {
            chats: db.repository::<Chat>(),
            max_retries: config.max_append_retries.max(1),
        }
    }

    pub fn database(&self) -> &Database {
        self.chats.database()
    }

    /// Returns the conversation between `user_id` and `admin_id`, creating it
    /// on first contact.
    pub async fn open(&self, user_id: &DocumentId, admin_id: &DocumentId) -> ClinicResult<Stored<Chat>> {
        let id = Chat::pair_id(user_id, admin_id);
        if let Some(existing) = self.chats.find(&id).await? {
            return Ok(existing);
        }
        let chat = Chat::new(user_id.clone(), admin_id.clone());
        match self.chats.create_with_id(Some(id.clone()), &chat).await {
            Ok(created) => {
                info!("Opened chat {} between {} and {}", created.id, user_id, admin_id);
                Ok(created)
            }
            // Lost the creation race; the other opener's document is the chat.
            Err(ClinicError::AlreadyExists(_)) => self.chats.get(&id).await,
            Err(e) => Err(e),
        }
    }

    /// Loads a chat on behalf of `viewer`, who must take part in it.
    pub async fn get(&self, chat_id: &DocumentId, viewer: &DocumentId) -> ClinicResult<Stored<Chat>> {
        let chat = self.chats.get(chat_id).await?;
        ensure_participant(&chat, viewer)?;
        Ok(chat)
    }

    pub async fn messages(&self, chat_id: &DocumentId, viewer: &DocumentId) -> ClinicResult<Vec<Message>> {
        Ok(self.get(chat_id, viewer).await?.record.messages())
    }

    pub async fn chats_for_user(&self, user_id: &DocumentId) -> ClinicResult<Vec<ChatSummary>> {
        self.summaries("user_id", user_id).await
    }

    pub async fn chats_for_admin(&self, admin_id: &DocumentId) -> ClinicResult<Vec<ChatSummary>> {
        self.summaries("admin_id", admin_id).await
    }

    async fn summaries(&self, field: &str, viewer: &DocumentId) -> ClinicResult<Vec<ChatSummary>> {
        let query = Query::new()
            .equal(field, viewer.as_str())
            .order_by("updated_at", SortOrder::Desc);
        let page = self.chats.list(&query).await?;
        Ok(page.items.iter().map(|chat| ChatSummary::for_viewer(chat, viewer)).collect())
    }

    pub async fn unread_count(&self, chat_id: &DocumentId, viewer: &DocumentId) -> ClinicResult<usize> {
        Ok(self.get(chat_id, viewer).await?.record.unread_for(viewer))
    }

    /// Appends a message from `sender_id` and returns it.
    pub async fn send_message(
        &self,
        chat_id: &DocumentId,
        sender_id: &DocumentId,
        content: &str,
    ) -> ClinicResult<Message> {
        let message = Message::new(sender_id, content)?;
        self.modify(chat_id, sender_id, |messages| {
            messages.push(message.clone());
            true
        })
        .await?;
        debug!("{} sent message {} in chat {}", sender_id, message.id, chat_id);
        Ok(message)
    }

    /// Marks the other party's messages as read by `reader_id` and returns
    /// how many changed. Nothing is written when all were already read.
    pub async fn mark_read(&self, chat_id: &DocumentId, reader_id: &DocumentId) -> ClinicResult<usize> {
        let mut changed = 0;
        self.modify(chat_id, reader_id, |messages| {
            changed = mark_read_by(messages, reader_id);
            changed > 0
        })
        .await?;
        Ok(changed)
    }

    /// Runs `change` against the current message list and writes the result
    /// if the document revision is unchanged, retrying on conflicts. `change`
    /// returns false to skip the write.
    async fn modify<F>(&self, chat_id: &DocumentId, actor: &DocumentId, mut change: F) -> ClinicResult<()>
    where
        F: FnMut(&mut Vec<Message>) -> bool,
    {
        let mut last_conflict = None;
        for attempt in 1..=self.max_retries {
            let stored = self.chats.get(chat_id).await?;
            ensure_participant(&stored, actor)?;

            let mut chat = stored.record;
            let mut messages = chat.messages();
            if !change(&mut messages) {
                return Ok(());
            }
            chat.set_messages(&messages);

            match self.chats.update_if_revision(chat_id, stored.revision, &chat).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_conflict() => {
                    debug!("chat {} changed under attempt {}, retrying", chat_id, attempt);
                    last_conflict = Some(e);
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e),
            }
        }
        warn!("giving up on chat {} after {} conflicting attempts", chat_id, self.max_retries);
        Err(last_conflict.unwrap_or_else(|| {
            ClinicError::Internal(format!("no attempt made to update {} {}", Chat::COLLECTION, chat_id))
        }))
    }
}

fn ensure_participant(chat: &Stored<Chat>, actor: &DocumentId) -> ClinicResult<()> {
    if chat.record.is_participant(actor) {
        Ok(())
    } else {
        Err(ClinicError::Forbidden(format!("{} is not part of chat {}", actor, chat.id)))
    }
}
