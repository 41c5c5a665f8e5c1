//! In-memory message service for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use train_types::{Message, ReactionAction, SortBy};

use crate::api::MessageApi;
use crate::error::ClientError;

pub struct FakeApi {
    online: AtomicBool,
    next_id: AtomicUsize,
    messages: Mutex<Vec<Message>>,
    created: Mutex<Vec<Message>>,
}

impl FakeApi {
    pub fn online() -> Self {
        Self {
            online: AtomicBool::new(true),
            next_id: AtomicUsize::new(1),
            messages: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn offline() -> Self {
        let api = Self::online();
        api.set_online(false);
        api
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Everything accepted by `create`, in call order.
    pub fn created(&self) -> Vec<Message> {
        self.created.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), ClientError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        }
    }
}

#[async_trait]
impl MessageApi for FakeApi {
    async fn list(&self, sort: SortBy) -> Result<Vec<Message>, ClientError> {
        self.check_online()?;
        let mut messages = self.messages.lock().unwrap().clone();
        match sort {
            SortBy::Newest => messages.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortBy::MostLiked => messages.sort_by(|a, b| b.likes.cmp(&a.likes)),
            SortBy::MostDisliked => messages.sort_by(|a, b| b.dislikes.cmp(&a.dislikes)),
        }
        messages.truncate(20);
        Ok(messages)
    }

    async fn create(&self, text: &str) -> Result<Message, ClientError> {
        self.check_online()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Status {
                status: 400,
                message: "Message content is required".into(),
            });
        }
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let message = Message::new(id, text, Utc::now());
        self.messages.lock().unwrap().push(message.clone());
        self.created.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn react(&self, id: &str, action: ReactionAction) -> Result<Message, ClientError> {
        self.check_online()?;
        let mut messages = self.messages.lock().unwrap();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ClientError::Status {
                status: 404,
                message: "Message not found".into(),
            })?;
        match action {
            ReactionAction::Like => message.likes += 1,
            ReactionAction::Dislike => message.dislikes += 1,
        }
        Ok(message.clone())
    }
}
