//! Write-ahead queue for messages created while the server was unreachable.
//!
//! Entries are replayed in order the next time the server answers. A
//! rejected entry is dropped so it cannot block the rest of the queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::MessageApi;
use crate::error::ClientError;
use crate::store::{read_json_or_default, write_json};

const OUTBOX_FILE: &str = "trainOfThoughtOutbox.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMessage {
    pub local_id: String,
    pub text: String,
    pub queued_at: DateTime<Utc>,
}

/// Clones share one lock. A flush holds it from read to write-back, so
/// pushes and other flushes wait for it.
#[derive(Debug, Clone)]
pub struct Outbox {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl Outbox {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(OUTBOX_FILE),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn pending(&self) -> Result<Vec<PendingMessage>, ClientError> {
        read_json_or_default(&self.path).await
    }

    pub async fn push(&self, entry: PendingMessage) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        let mut queue = self.pending().await?;
        debug!("Queued message {} for later delivery", entry.local_id);
        queue.push(entry);
        write_json(&self.path, &queue).await
    }

    /// Send queued messages oldest first. Stops at the first transport
    /// failure, keeping it and everything after it. Returns how many were
    /// delivered.
    pub async fn flush<A: MessageApi + ?Sized>(&self, api: &A) -> Result<usize, ClientError> {
        let _guard = self.lock.lock().await;
        let mut queue = self.pending().await?;
        if queue.is_empty() {
            return Ok(0);
        }

        let mut delivered = 0;
        while let Some(entry) = queue.first() {
            match api.create(&entry.text).await {
                Ok(stored) => {
                    debug!("Delivered {} as {}", entry.local_id, stored.id);
                    delivered += 1;
                }
                Err(e) if e.is_rejection() => {
                    warn!("Dropping queued message {}: {}", entry.local_id, e);
                }
                Err(e) => {
                    write_json(&self.path, &queue).await?;
                    return Err(e);
                }
            }
            queue.remove(0);
        }

        write_json(&self.path, &queue).await?;
        info!("Delivered {} queued messages", delivered);
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    fn entry(id: &str, text: &str) -> PendingMessage {
        PendingMessage {
            local_id: id.into(),
            text: text.into(),
            queued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn flush_replays_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::in_dir(dir.path());
        outbox.push(entry("1", "first")).await.unwrap();
        outbox.push(entry("2", "second")).await.unwrap();

        let api = FakeApi::online();
        assert_eq!(outbox.flush(&api).await.unwrap(), 2);
        assert!(outbox.pending().await.unwrap().is_empty());

        let texts: Vec<String> = api.created().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn offline_flush_keeps_queue() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::in_dir(dir.path());
        outbox.push(entry("1", "first")).await.unwrap();

        let api = FakeApi::offline();
        assert!(outbox.flush(&api).await.is_err());
        assert_eq!(outbox.pending().await.unwrap().len(), 1);

        api.set_online(true);
        assert_eq!(outbox.flush(&api).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::in_dir(dir.path());
        outbox.push(entry("1", "   ")).await.unwrap();
        outbox.push(entry("2", "kept")).await.unwrap();

        let api = FakeApi::online();
        assert_eq!(outbox.flush(&api).await.unwrap(), 1);
        assert!(outbox.pending().await.unwrap().is_empty());
        assert_eq!(api.created().len(), 1);
    }

    #[tokio::test]
    async fn push_during_flush_is_kept_once() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::in_dir(dir.path());
        outbox.push(entry("1", "first")).await.unwrap();

        let api = FakeApi::online();
        let (flushed, pushed) = tokio::join!(outbox.flush(&api), outbox.push(entry("2", "second")));
        flushed.unwrap();
        pushed.unwrap();

        let mut seen: Vec<String> = api.created().into_iter().map(|m| m.text).collect();
        seen.extend(outbox.pending().await.unwrap().into_iter().map(|p| p.text));
        seen.sort();
        assert_eq!(seen, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn concurrent_flushes_deliver_once() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::in_dir(dir.path());
        outbox.push(entry("1", "first")).await.unwrap();

        let api = FakeApi::online();
        let other = outbox.clone();
        let (a, b) = tokio::join!(outbox.flush(&api), other.flush(&api));
        assert_eq!(a.unwrap() + b.unwrap(), 1);
        assert_eq!(api.created().len(), 1);
        assert!(outbox.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_outbox_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = Outbox::in_dir(dir.path());
        let api = FakeApi::offline();
        assert_eq!(outbox.flush(&api).await.unwrap(), 0);
    }
}
