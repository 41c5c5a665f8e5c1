use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use train_types::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client sent something we refuse to store or act on.
    #[error("{0}")]
    Validation(String),

    #[error("Message not found")]
    NotFound,

    /// Carries the public message only; the cause is logged where it happened.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a `map_err` closure that logs `cause` and hides it from the client.
    pub fn internal<E: std::fmt::Display>(public: &'static str) -> impl FnOnce(E) -> Self {
        move |cause| {
            error!("{}: {}", public, cause);
            Self::Internal(public)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes() {
        assert_eq!(ApiError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("Failed to fetch messages").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_hides_cause() {
        let err = ApiError::internal::<&str>("Failed to create message")("disk on fire");
        assert_eq!(err.to_string(), "Failed to create message");
    }
}
