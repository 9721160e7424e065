// rest_api/src/routes/chats.rs

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use lib::{ChangeEvent, ChangeKind, ChatSummary, RevisionGate, Subscription};
use models::medical::Role;
use models::{Chat, DocumentId, Entity, Message, Stored};
use security::Permission;

use super::{created, data, ApiResult, CreatedResult};
use crate::error::RestApiError;
use crate::extract::{ApiJson, ApiPath, CurrentUser};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_chats_handler).post(open_chat_handler))
        .route("/chats/:id", get(get_chat_handler))
        .route("/chats/:id/messages", post(send_message_handler))
        .route("/chats/:id/read", post(mark_read_handler))
        .route("/chats/:id/events", get(chat_events_handler))
}

/// A chat with its decoded messages, as seen by one participant.
#[derive(Debug, Serialize)]
pub struct ChatView {
    pub id: DocumentId,
    pub user_id: DocumentId,
    pub admin_id: DocumentId,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
    pub unread: usize,
    pub messages: Vec<Message>,
}

impl ChatView {
    fn new(chat: &Stored<Chat>, viewer: &DocumentId) -> Self {
        let messages = chat.record.messages();
        ChatView {
            id: chat.id.clone(),
            user_id: chat.record.user_id.clone(),
            admin_id: chat.record.admin_id.clone(),
            revision: chat.revision,
            updated_at: chat.updated_at,
            unread: models::chat::unread_count(&messages, viewer),
            messages,
        }
    }
}

/// A patient names the administrator; an administrator names the patient.
#[derive(Debug, Deserialize)]
struct OpenChatRequest {
    user_id: Option<DocumentId>,
    admin_id: Option<DocumentId>,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
}

async fn open_chat_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<OpenChatRequest>,
) -> CreatedResult<ChatView> {
    current.require(Permission::Chat)?;
    let (user_id, admin_id, expected_role) = match current.role {
        Role::Admin => {
            let user_id = payload
                .user_id
                .ok_or_else(|| RestApiError::InvalidInput("user_id is required".to_string()))?;
            (user_id, current.id.clone(), Role::Patient)
        }
        Role::Patient => {
            let admin_id = payload
                .admin_id
                .ok_or_else(|| RestApiError::InvalidInput("admin_id is required".to_string()))?;
            (current.id.clone(), admin_id, Role::Admin)
        }
    };
    let other_id = if current.role == Role::Admin { &user_id } else { &admin_id };
    let other = state.users.get(other_id).await?;
    if other.record.role != expected_role {
        return Err(RestApiError::InvalidInput(
            "a chat pairs a patient with an administrator".to_string(),
        ));
    }
    let chat = state.chats.open(&user_id, &admin_id).await?;
    created(ChatView::new(&chat, &current.id))
}

async fn list_chats_handler(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<ChatSummary>> {
    current.require(Permission::Chat)?;
    let chats = if current.role == Role::Admin {
        state.chats.chats_for_admin(&current.id).await?
    } else {
        state.chats.chats_for_user(&current.id).await?
    };
    data(chats)
}

async fn get_chat_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<ChatView> {
    current.require(Permission::Chat)?;
    let chat = state.chats.get(&id, &current.id).await?;
    data(ChatView::new(&chat, &current.id))
}

async fn send_message_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> CreatedResult<Message> {
    current.require(Permission::Chat)?;
    created(state.chats.send_message(&id, &current.id, &payload.content).await?)
}

async fn mark_read_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> ApiResult<Value> {
    current.require(Permission::Chat)?;
    let marked = state.chats.mark_read(&id, &current.id).await?;
    data(json!({ "marked": marked }))
}

fn chat_event(event: &ChangeEvent, viewer: &DocumentId) -> Result<Event, axum::Error> {
    if event.kind == ChangeKind::Deleted {
        return Ok(Event::default().event("deleted").data(event.document_id.as_str()));
    }
    match Stored::<Chat>::from_document(&event.document) {
        Ok(chat) => Event::default().event("chat").json_data(ChatView::new(&chat, viewer)),
        Err(e) => Ok(Event::default().event("error").data(e.to_string())),
    }
}

/// Change events newer than `revision`, in the order they become current.
fn chat_updates(subscription: Subscription, revision: u64) -> impl Stream<Item = ChangeEvent> {
    let gate = RevisionGate::new(revision);
    stream::unfold((subscription, gate), |(mut subscription, mut gate)| async move {
        loop {
            let event = subscription.recv().await?;
            if gate.admit(&event) {
                return Some((event, (subscription, gate)));
            }
        }
    })
}

/// Server-sent events for one chat: its current state first, then every
/// newer change as it is written.
async fn chat_events_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<DocumentId>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, RestApiError> {
    current.require(Permission::Chat)?;
    // Subscribe before reading so nothing written in between is missed.
    let subscription = state.db.events().subscribe_document(Chat::COLLECTION, id.clone());
    let chat = state.chats.get(&id, &current.id).await?;
    let initial = Event::default().event("chat").json_data(ChatView::new(&chat, &current.id));
    debug!("{} subscribed to chat {}", current.id, id);

    let viewer = current.id;
    let updates = chat_updates(subscription, chat.revision).map(move |event| chat_event(&event, &viewer));

    Ok(Sse::new(stream::once(async move { initial }).chain(updates)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib::EventBus;
    use models::Document;
    use serde_json::json;

    fn chat_at(revision: u64) -> ChangeEvent {
        let mut document = Document::new(Chat::COLLECTION, "c1".parse().unwrap(), json!({}));
        document.revision = revision;
        ChangeEvent::new(ChangeKind::Updated, document)
    }

    #[tokio::test]
    async fn updates_skip_revisions_already_sent() {
        let bus = EventBus::new(8);
        let updates = chat_updates(bus.subscribe(Chat::COLLECTION), 2);
        for revision in [2, 4, 3, 5] {
            bus.publish(chat_at(revision));
        }
        drop(bus);
        let revisions: Vec<u64> = updates.map(|event| event.document.revision).collect().await;
        assert_eq!(revisions, vec![4, 5]);
    }
}
