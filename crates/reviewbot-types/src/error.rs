use thiserror::Error;

use crate::session::UserId;

/// Errors from repository operations (used by trait definitions in reviewbot-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),
}

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request itself failed (connect, timeout, ...).
    #[error("transport request failed: {0}")]
    Request(String),

    /// The transport answered with an error.
    #[error("transport api error {code}: {description}")]
    Api { code: i64, description: String },

    /// The response could not be decoded.
    #[error("transport response decode failed: {0}")]
    Decode(String),
}

/// Failures raised while a session actor handles one event.
///
/// Every variant is reported to the user as a single retry-later reply.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store: {0}")]
    Repository(#[from] RepositoryError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

/// Why an event could not be placed in a session inbox.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InboxError {
    /// The inbox is at capacity; the event was dropped.
    #[error("inbox full for user {0}")]
    Full(UserId),

    /// The actor has stopped and no longer consumes its inbox.
    #[error("inbox closed for user {0}")]
    Closed(UserId),
}

/// Inbound events rejected before reaching any session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("event has no sender")]
    MissingSender,

    #[error("event has no chat")]
    MissingChat,
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },
}
