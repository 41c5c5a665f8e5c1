use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message left on the board by a fellow traveller.
///
/// The id is opaque to clients: the server hands out UUIDs, while messages
/// created offline carry a millisecond timestamp until they are synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub likes: u32,
    pub dislikes: u32,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A fresh message with zeroed counters.
    pub fn new(id: impl Into<String>, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            likes: 0,
            dislikes: 0,
            created_at,
        }
    }
}
