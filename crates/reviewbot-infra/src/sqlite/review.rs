//! SQLite review store.
//!
//! Implements `ReviewStore` from `reviewbot-core`. Every submission is a new
//! row in `reviews`; the content is stored as JSON text.

use chrono::Utc;
use reviewbot_core::repository::ReviewStore;
use reviewbot_types::error::RepositoryError;
use reviewbot_types::review::ReviewContent;
use reviewbot_types::session::UserId;
use uuid::Uuid;

use super::{db_error, format_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `ReviewStore`.
pub struct SqliteReviewStore {
    pool: DatabasePool,
}

impl SqliteReviewStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl ReviewStore for SqliteReviewStore {
    async fn store(&self, user_id: UserId, content: &ReviewContent) -> Result<(), RepositoryError> {
        let id = Uuid::now_v7();
        let now = format_datetime(&Utc::now());
        let content_json = serde_json::to_string(content)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize review: {e}")))?;

        sqlx::query(
            "INSERT INTO reviews (id, tg_user_id, review_content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(user_id.0)
        .bind(&content_json)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(db_error)?;

        tracing::debug!(%user_id, review_id = %id, "review stored");
        Ok(())
    }
}
