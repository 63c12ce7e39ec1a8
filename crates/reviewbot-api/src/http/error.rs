//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use reviewbot_types::error::DispatchError;

/// Errors a handler can return.
#[derive(Debug)]
pub enum AppError {
    /// The body is not a Telegram update.
    InvalidUpdate(String),
    /// The update has no sender or chat.
    Dispatch(DispatchError),
    /// Generic internal error.
    Internal(String),
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::Dispatch(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidUpdate(msg) => (StatusCode::BAD_REQUEST, "INVALID_UPDATE", msg.clone()),
            AppError::Dispatch(e @ DispatchError::MissingSender) => {
                (StatusCode::BAD_REQUEST, "MISSING_SENDER", e.to_string())
            }
            AppError::Dispatch(e @ DispatchError::MissingChat) => {
                (StatusCode::BAD_REQUEST, "MISSING_CHAT", e.to_string())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = json!({
            "ok": false,
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (status, axum::Json(body)).into_response()
    }
}
