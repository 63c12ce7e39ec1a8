//! Per-user session state.
//!
//! `SessionData` is the durable record kept for every chat user. The live
//! session actor holds the authoritative copy while it is running and writes
//! it back on every state-affecting transition.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Identity of a chat user (the transport's numeric user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Destination for replies (the transport's numeric chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Conversation state of a user.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (state IN ('init', 'comment'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No submission in progress.
    #[default]
    Init,
    /// Collecting review content.
    Comment,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Init => write!(f, "init"),
            SessionState::Comment => write!(f, "comment"),
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "init" => Ok(SessionState::Init),
            "comment" => Ok(SessionState::Comment),
            other => Err(format!("invalid session state: '{other}'")),
        }
    }
}

/// Durable per-user session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: UserId,
    pub state: SessionState,
    /// Empty until the user shares their own contact.
    #[serde(default)]
    pub phone_number: String,
}

impl SessionData {
    /// The record used for a user with no stored row.
    pub fn initial(user_id: UserId) -> Self {
        Self {
            user_id,
            state: SessionState::Init,
            phone_number: String::new(),
        }
    }

    /// Whether the user still has to share a phone number.
    pub fn needs_phone_number(&self) -> bool {
        self.phone_number.is_empty()
    }
}
