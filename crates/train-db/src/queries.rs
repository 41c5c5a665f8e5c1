use crate::models::MessageRow;
use crate::Database;
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row};
use train_types::{ReactionAction, SortBy};

const MESSAGE_COLUMNS: &str = "id, text, likes, dislikes, created_at";

impl Database {
    // -- Messages --

    pub fn insert_message(&self, id: &str, text: &str, created_at: DateTime<Utc>) -> Result<MessageRow> {
        let created_at = format_timestamp(created_at);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, likes, dislikes, created_at) VALUES (?1, ?2, 0, 0, ?3)",
                rusqlite::params![id, text, created_at],
            )?;
            Ok(MessageRow {
                id: id.to_string(),
                text: text.to_string(),
                likes: 0,
                dislikes: 0,
                created_at,
            })
        })
    }

    pub fn list_messages(&self, sort: SortBy, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, sort, limit))
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    // -- Reactions --

    /// Bump exactly one counter by one.
    /// Returns the updated row, or `None` when no message has this id.
    pub fn add_reaction(&self, id: &str, action: ReactionAction) -> Result<Option<MessageRow>> {
        let sql = match action {
            ReactionAction::Like => "UPDATE messages SET likes = likes + 1 WHERE id = ?1",
            ReactionAction::Dislike => "UPDATE messages SET dislikes = dislikes + 1 WHERE id = ?1",
        };

        self.with_conn(|conn| {
            let changed = conn.execute(sql, [id])?;
            if changed == 0 {
                return Ok(None);
            }
            query_message(conn, id)
        })
    }
}

/// Fixed-width UTC timestamps so lexical order in SQLite matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_messages(conn: &Connection, sort: SortBy, limit: u32) -> Result<Vec<MessageRow>> {
    let order = match sort {
        SortBy::Newest => "created_at DESC, rowid DESC",
        SortBy::MostLiked => "likes DESC, created_at DESC, rowid DESC",
        SortBy::MostDisliked => "dislikes DESC, created_at DESC, rowid DESC",
    };
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY {order} LIMIT ?1");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit], map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))?;
    let row = stmt.query_row([id], map_message_row).optional()?;
    Ok(row)
}

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        likes: row.get(2)?,
        dislikes: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
