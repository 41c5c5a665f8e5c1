//! Offline copy of the board, kept as a JSON file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use train_story::board::CACHE_LIMIT;
use train_types::Message;

use crate::error::ClientError;

pub const STORAGE_KEY: &str = "trainOfThoughtMessages";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored messages, newest first. A missing file is an empty store.
    pub async fn load(&self) -> Result<Vec<Message>, ClientError> {
        let mut messages: Vec<Message> = read_json_or_default(&self.path).await?;
        messages.truncate(CACHE_LIMIT);
        Ok(messages)
    }

    pub async fn save(&self, messages: &[Message]) -> Result<(), ClientError> {
        let keep = &messages[..messages.len().min(CACHE_LIMIT)];
        write_json(&self.path, keep).await
    }
}

/// A message created without the server. Its id is the creation time in
/// milliseconds.
pub fn local_message(text: &str, now: DateTime<Utc>) -> Message {
    Message::new(now.timestamp_millis().to_string(), text, now)
}

pub(crate) async fn read_json_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, ClientError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Write through a temp file so a crash never leaves half a document.
pub(crate) async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ClientError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec(value)?;
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
