//! Review submission records.

use serde::{Deserialize, Serialize};

/// One piece of submitted review content.
///
/// Serialized as JSON `{"text": ..., "media_urls": [...]}` in the review store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewContent {
    pub text: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

impl ReviewContent {
    pub fn new(text: impl Into<String>, media_urls: Vec<String>) -> Self {
        Self {
            text: text.into(),
            media_urls,
        }
    }
}
