// lib/src/chat/watcher.rs

use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use models::errors::ClinicResult;
use models::{Chat, Document, DocumentId, Entity, Message, Stored};

use crate::database::Database;
use crate::realtime::{ChangeKind, RevisionGate, Subscription};

/// Keeps a local copy of one chat's messages current. Change events are
/// applied as they arrive unless they are older than the copy; a periodic
/// re-fetch catches anything the event stream missed and replaces the local
/// copy when the message count differs or the chat is gone.
pub struct ChatWatcher {
    chat_id: DocumentId,
    state: watch::Receiver<Vec<Message>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChatWatcher {
    pub async fn start(db: Database, chat_id: DocumentId, poll_interval: Duration) -> ClinicResult<Self> {
        // Subscribe before the first read so no write falls between them.
        let subscription = db.events().subscribe_document(Chat::COLLECTION, chat_id.clone());
        Self::start_with(db, chat_id, poll_interval, subscription).await
    }

    async fn start_with(
        db: Database,
        chat_id: DocumentId,
        poll_interval: Duration,
        subscription: Subscription,
    ) -> ClinicResult<Self> {
        let document = db.get(Chat::COLLECTION, &chat_id).await?;
        let gate = RevisionGate::new(document.revision);
        let (sender, state) = watch::channel(messages_of(&document)?);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(watch_chat(
            db,
            chat_id.clone(),
            poll_interval,
            subscription,
            gate,
            sender,
            shutdown_rx,
        ));
        info!("Watching chat {} (poll every {:?})", chat_id, poll_interval);
        Ok(ChatWatcher {
            chat_id,
            state,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    pub fn chat_id(&self) -> &DocumentId {
        &self.chat_id
    }

    /// Current local copy.
    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.state.clone()
    }

    /// Waits until the local copy changes. Returns false once the watcher
    /// has stopped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("chat watcher for {} ended abnormally: {}", self.chat_id, e);
            }
        }
    }
}

impl Drop for ChatWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn messages_of(document: &Document) -> ClinicResult<Vec<Message>> {
    Ok(Stored::<Chat>::from_document(document)?.record.messages())
}

async fn watch_chat(
    db: Database,
    chat_id: DocumentId,
    poll_interval: Duration,
    mut subscription: Subscription,
    mut gate: RevisionGate,
    state: watch::Sender<Vec<Message>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut realtime_open = true;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = subscription.recv(), if realtime_open => match event {
                Some(event) if !gate.admit(&event) => {}
                Some(event) if event.kind == ChangeKind::Deleted => {
                    info!("chat {} was deleted, clearing local state", chat_id);
                    state.send_replace(Vec::new());
                }
                Some(event) => match messages_of(&event.document) {
                    Ok(messages) => {
                        state.send_if_modified(|current| {
                            if *current == messages {
                                return false;
                            }
                            *current = messages;
                            true
                        });
                    }
                    Err(e) => warn!("ignoring undecodable update for chat {}: {}", chat_id, e),
                },
                None => {
                    warn!("event stream for chat {} closed, relying on polling", chat_id);
                    realtime_open = false;
                }
            },
            _ = ticker.tick() => match db.find(Chat::COLLECTION, &chat_id).await {
                Ok(Some(document)) => poll_found(&chat_id, &document, &mut gate, &state),
                Ok(None) => {
                    if !gate.is_deleted() {
                        info!("chat {} no longer exists, clearing local state", chat_id);
                        gate.mark_deleted();
                    }
                    state.send_if_modified(|current| {
                        let had_messages = !current.is_empty();
                        current.clear();
                        had_messages
                    });
                }
                Err(e) => warn!("poll of chat {} failed: {}", chat_id, e),
            },
        }
    }
    debug!("stopped watching chat {}", chat_id);
}

/// Applies a polled copy when it is newer than the local one and its message
/// count differs. A chat that reappears after a deletion is always taken.
fn poll_found(
    chat_id: &DocumentId,
    document: &Document,
    gate: &mut RevisionGate,
    state: &watch::Sender<Vec<Message>>,
) {
    if !gate.is_deleted() && document.revision <= gate.revision() {
        return;
    }
    let messages = match messages_of(document) {
        Ok(messages) => messages,
        Err(e) => {
            warn!("poll of chat {} returned bad data: {}", chat_id, e);
            return;
        }
    };
    let recreated = gate.is_deleted();
    state.send_if_modified(|current| {
        if !recreated && current.len() == messages.len() {
            return false;
        }
        debug!(
            "poll found {} messages in chat {} at rev {}, had {}",
            messages.len(),
            chat_id,
            document.revision,
            current.len()
        );
        gate.observe(document);
        let changed = *current != messages;
        *current = messages;
        changed
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatService;
    use crate::config::ChatConfig;
    use crate::realtime::{ChangeEvent, EventBus};
    use tokio::time::{sleep, timeout};

    fn id(s: &str) -> DocumentId {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn realtime_updates_arrive_without_polling() {
        let db = Database::in_memory();
        let chats = ChatService::new(&db, &ChatConfig::default());
        let chat = chats.open(&id("patient1"), &id("admin1")).await.unwrap();

        let mut watcher = ChatWatcher::start(db.clone(), chat.id.clone(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(watcher.messages().is_empty());

        chats.send_message(&chat.id, &id("admin1"), "Hello!").await.unwrap();
        assert!(timeout(Duration::from_secs(2), watcher.changed()).await.unwrap());
        assert_eq!(watcher.messages()[0].content, "Hello!");
        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn polling_catches_silent_writes() {
        let db = Database::in_memory();
        let chats = ChatService::new(&db, &ChatConfig::default());
        let chat = chats.open(&id("patient1"), &id("admin1")).await.unwrap();
        let mut watcher = ChatWatcher::start(db.clone(), chat.id.clone(), Duration::from_millis(20))
            .await
            .unwrap();

        // Write through the raw store so no change event is published.
        let mut record = chat.record.clone();
        record.set_messages(&[Message::new(&id("patient1"), "sneaky").unwrap()]);
        db.store()
            .replace(Chat::COLLECTION, &chat.id, record.to_data().unwrap())
            .await
            .unwrap();

        assert!(timeout(Duration::from_secs(2), watcher.changed()).await.unwrap());
        assert_eq!(watcher.messages().len(), 1);
        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn deletion_event_clears_state() {
        let db = Database::in_memory();
        let chats = ChatService::new(&db, &ChatConfig::default());
        let chat = chats.open(&id("patient1"), &id("admin1")).await.unwrap();
        chats.send_message(&chat.id, &id("patient1"), "Hi").await.unwrap();
        let mut watcher = ChatWatcher::start(db.clone(), chat.id.clone(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(watcher.messages().len(), 1);

        db.delete(Chat::COLLECTION, &chat.id).await.unwrap();
        assert!(timeout(Duration::from_secs(2), watcher.changed()).await.unwrap());
        assert!(watcher.messages().is_empty());
        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn polling_clears_silently_deleted_chat() {
        let db = Database::in_memory();
        let chats = ChatService::new(&db, &ChatConfig::default());
        let chat = chats.open(&id("patient1"), &id("admin1")).await.unwrap();
        chats.send_message(&chat.id, &id("patient1"), "Hi").await.unwrap();
        let mut watcher = ChatWatcher::start(db.clone(), chat.id.clone(), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(watcher.messages().len(), 1);

        // The raw store publishes nothing, so only the poll can notice.
        db.store().delete(Chat::COLLECTION, &chat.id).await.unwrap();
        assert!(timeout(Duration::from_secs(2), watcher.changed()).await.unwrap());
        assert!(watcher.messages().is_empty());
        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn older_revision_event_is_ignored() {
        let db = Database::in_memory();
        let chats = ChatService::new(&db, &ChatConfig::default());
        let chat = chats.open(&id("patient1"), &id("admin1")).await.unwrap();
        let mut watcher = ChatWatcher::start(db.clone(), chat.id.clone(), Duration::from_secs(3600))
            .await
            .unwrap();

        chats.send_message(&chat.id, &id("patient1"), "first").await.unwrap();
        let second_revision = db.get(Chat::COLLECTION, &chat.id).await.unwrap();
        assert_eq!(second_revision.revision, 2);
        chats.send_message(&chat.id, &id("admin1"), "second").await.unwrap();
        while watcher.messages().len() < 2 {
            assert!(timeout(Duration::from_secs(2), watcher.changed()).await.unwrap());
        }

        // Delivered late, as when two writers publish out of order.
        db.events().publish(ChangeEvent::new(ChangeKind::Updated, second_revision));
        sleep(Duration::from_millis(200)).await;
        let messages = watcher.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "second");
        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn polling_continues_after_event_stream_closes() {
        let db = Database::in_memory();
        let chats = ChatService::new(&db, &ChatConfig::default());
        let chat = chats.open(&id("patient1"), &id("admin1")).await.unwrap();

        let bus = EventBus::new(4);
        let subscription = bus.subscribe_document(Chat::COLLECTION, chat.id.clone());
        drop(bus);
        let mut watcher =
            ChatWatcher::start_with(db.clone(), chat.id.clone(), Duration::from_millis(20), subscription)
                .await
                .unwrap();
        // Let the watcher observe the closed stream before writing.
        sleep(Duration::from_millis(50)).await;

        chats.send_message(&chat.id, &id("admin1"), "still there?").await.unwrap();
        assert!(timeout(Duration::from_secs(2), watcher.changed()).await.unwrap());
        assert_eq!(watcher.messages()[0].content, "still there?");
        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn missing_chat_fails_to_start() {
        let db = Database::in_memory();
        let result = ChatWatcher::start(db, id("ghost"), Duration::from_secs(1)).await;
        assert!(result.err().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn shutdown_closes_subscribers() {
        let db = Database::in_memory();
        let chats = ChatService::new(&db, &ChatConfig::default());
        let chat = chats.open(&id("patient1"), &id("admin1")).await.unwrap();
        let watcher = ChatWatcher::start(db.clone(), chat.id.clone(), Duration::from_secs(60))
            .await
            .unwrap();
        let mut receiver = watcher.subscribe();
        watcher.shutdown().await;
        assert!(receiver.changed().await.is_err());
    }
}
