use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use train_db::models::MessageRow;
use train_types::Message;
use train_types::api::{
    CreateMessageRequest, LIST_LIMIT, ListMessagesQuery, MAX_MESSAGE_CHARS, ReactMessageRequest,
    ReactionAction, SortBy,
};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /messages?sortBy=newest|mostLiked|mostDisliked
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    const FAILED: &str = "Failed to fetch messages";

    let sort = SortBy::from_query(query.sort_by.as_deref());
    debug!("Listing messages sorted by {}", sort);

    // Run blocking DB query off the async runtime
    let rows = tokio::task::spawn_blocking(move || state.db.list_messages(sort, LIST_LIMIT))
        .await
        .map_err(ApiError::internal(FAILED))?
        .map_err(ApiError::internal(FAILED))?;

    Ok(Json(rows.into_iter().map(row_to_message).collect()))
}

/// POST /messages with `{ "text": "..." }`
pub async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    const FAILED: &str = "Failed to create message";

    let Json(req) = payload.map_err(|e| {
        warn!("Rejected create body: {}", e);
        ApiError::validation("Message content is required")
    })?;

    let text = validate_text(req.text.as_deref())?;
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let row = tokio::task::spawn_blocking(move || state.db.insert_message(&id, &text, now))
        .await
        .map_err(ApiError::internal(FAILED))?
        .map_err(ApiError::internal(FAILED))?;

    info!("Message {} created", row.id);
    Ok((StatusCode::CREATED, Json(row_to_message(row))))
}

/// PATCH /messages with `{ "id": "...", "action": "like" | "dislike" }`
///
/// Every call counts; repeat reactions are only prevented client-side.
pub async fn react_to_message(
    State(state): State<AppState>,
    payload: Result<Json<ReactMessageRequest>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    const FAILED: &str = "Failed to update message";

    let Json(req) = payload.map_err(|e| {
        warn!("Rejected reaction body: {}", e);
        ApiError::validation("Message ID and action are required")
    })?;

    let (id, action) = validate_reaction(req)?;

    let row = tokio::task::spawn_blocking(move || state.db.add_reaction(&id, action))
        .await
        .map_err(ApiError::internal(FAILED))?
        .map_err(ApiError::internal(FAILED))?
        .ok_or(ApiError::NotFound)?;

    debug!("Message {} got a {}", row.id, action.as_str());
    Ok(Json(row_to_message(row)))
}

fn validate_text(raw: Option<&str>) -> Result<String, ApiError> {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::validation("Message content is required"));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::validation(format!(
            "Message is too long (max {} characters)",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(text.to_string())
}

fn validate_reaction(req: ReactMessageRequest) -> Result<(String, ReactionAction), ApiError> {
    let (Some(id), Some(action)) = (req.id, req.action) else {
        return Err(ApiError::validation("Message ID and action are required"));
    };
    if id.is_empty() || action.is_empty() {
        return Err(ApiError::validation("Message ID and action are required"));
    }

    let action = action
        .parse::<ReactionAction>()
        .map_err(|_| ApiError::validation(r#"Invalid action. Use "like" or "dislike""#))?;

    Ok((id, action))
}

fn row_to_message(row: MessageRow) -> Message {
    let created_at = row
        .created_at
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's own datetime() output has no timezone; treat it as UTC.
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on message '{}': {}", row.created_at, row.id, e);
            DateTime::default()
        });

    Message {
        id: row.id,
        text: row.text,
        likes: row.likes,
        dislikes: row.dislikes,
        created_at,
    }
}
