//! Keeps the board in step with the message service, falling back to the
//! offline store when the service cannot be reached.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use train_story::board::CACHE_LIMIT;
use train_types::{Message, ReactionAction, SortBy};

use crate::api::MessageApi;
use crate::error::ClientError;
use crate::outbox::{Outbox, PendingMessage};
use crate::store::{LocalStore, local_message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Server,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    /// Stored by the server; the board should be re-fetched.
    Server(Message),
    /// Kept offline and queued. `cache` is the new board listing.
    Local { message: Message, cache: Vec<Message> },
    /// The server refused the text. The draft stays.
    Rejected(String),
    /// Neither the server nor the offline store took it.
    Failed,
}

pub struct BoardSync<A> {
    api: A,
    store: LocalStore,
    outbox: Outbox,
}

impl<A: MessageApi> BoardSync<A> {
    pub fn new(api: A, store: LocalStore, outbox: Outbox) -> Self {
        Self { api, store, outbox }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Deliver anything queued, then list. On failure the offline store
    /// stands in.
    pub async fn refresh(&self, sort: SortBy) -> (Vec<Message>, Source) {
        if let Err(e) = self.outbox.flush(&self.api).await {
            debug!("Outbox not flushed: {}", e);
        }

        match self.api.list(sort).await {
            Ok(messages) => (messages, Source::Server),
            Err(e) => {
                warn!("Error fetching messages: {}", e);
                let local = self.store.load().await.unwrap_or_else(|e| {
                    warn!("Error reading offline messages: {}", e);
                    Vec::new()
                });
                (local, Source::Local)
            }
        }
    }

    /// Post `text`. If the server is unreachable the message goes on top of
    /// `current` in the offline store and into the outbox.
    pub async fn submit(&self, text: &str, current: &[Message], now: DateTime<Utc>) -> Submitted {
        let err = match self.api.create(text).await {
            Ok(message) => return Submitted::Server(message),
            Err(e) => e,
        };

        if err.is_rejection() {
            warn!("Message rejected: {}", err);
            return match err {
                ClientError::Status { message, .. } => Submitted::Rejected(message),
                other => Submitted::Rejected(other.to_string()),
            };
        }
        warn!("Error saving message: {}", err);

        let message = local_message(text, now);
        let cache: Vec<Message> = std::iter::once(message.clone())
            .chain(current.iter().cloned())
            .take(CACHE_LIMIT)
            .collect();

        if let Err(e) = self.store.save(&cache).await {
            warn!("Error saving offline messages: {}", e);
            return Submitted::Failed;
        }

        let pending = PendingMessage {
            local_id: message.id.clone(),
            text: message.text.clone(),
            queued_at: now,
        };
        if let Err(e) = self.outbox.push(pending).await {
            warn!("Error queueing message {}: {}", message.id, e);
        }

        Submitted::Local { message, cache }
    }

    /// Send a reaction and re-list. An error means the caller should roll
    /// back its optimistic flags.
    pub async fn react(
        &self,
        id: &str,
        action: ReactionAction,
        sort: SortBy,
    ) -> Result<(Vec<Message>, Source), ClientError> {
        self.api.react(id, action).await.inspect_err(|e| {
            warn!("Error updating reaction on {}: {}", id, e);
        })?;
        Ok(self.refresh(sort).await)
    }
}
