//! SQLite session store.
//!
//! Implements `SessionStore` from `reviewbot-core`. One row per user in
//! `review_user_session`; `save` is an upsert keyed by `tg_user_id`.

use chrono::Utc;
use reviewbot_core::repository::SessionStore;
use reviewbot_types::error::RepositoryError;
use reviewbot_types::session::{SessionData, SessionState, UserId};
use sqlx::Row;

use super::{db_error, format_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct SessionRow {
    tg_user_id: i64,
    state: String,
    phone_number: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tg_user_id: row.try_get("tg_user_id")?,
            state: row.try_get("state")?,
            phone_number: row.try_get("phone_number")?,
        })
    }

    fn into_data(self) -> Result<SessionData, RepositoryError> {
        let state: SessionState = self.state.parse().map_err(RepositoryError::Query)?;

        Ok(SessionData {
            user_id: UserId(self.tg_user_id),
            state,
            phone_number: self.phone_number,
        })
    }
}

impl SessionStore for SqliteSessionStore {
    async fn load(&self, user_id: UserId) -> Result<Option<SessionData>, RepositoryError> {
        let row = sqlx::query(
            "SELECT tg_user_id, state, phone_number FROM review_user_session WHERE tg_user_id = ?",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => {
                let row =
                    SessionRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(row.into_data()?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, data: &SessionData) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());

        sqlx::query(
            r#"INSERT INTO review_user_session (tg_user_id, state, phone_number, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (tg_user_id) DO UPDATE SET
                   state = excluded.state,
                   phone_number = excluded.phone_number,
                   updated_at = excluded.updated_at"#,
        )
        .bind(data.user_id.0)
        .bind(data.state.to_string())
        .bind(&data.phone_number)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(db_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let store = SqliteSessionStore::new(test_pool().await);
        assert!(store.load(UserId(3678)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = SqliteSessionStore::new(test_pool().await);
        let data = SessionData {
            user_id: UserId(3678),
            state: SessionState::Comment,
            phone_number: "86478901".to_string(),
        };

        store.save(&data).await.unwrap();

        assert_eq!(store.load(UserId(3678)).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_closed_pool_is_a_connection_error() {
        let pool = test_pool().await;
        let store = SqliteSessionStore::new(pool.clone());
        pool.writer.close().await;

        let err = store.save(&SessionData::initial(UserId(1))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Connection));
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let pool = test_pool().await;
        let store = SqliteSessionStore::new(pool.clone());
        let mut data = SessionData::initial(UserId(42));

        store.save(&data).await.unwrap();
        data.state = SessionState::Comment;
        store.save(&data).await.unwrap();
        // saving the same value again is harmless
        store.save(&data).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM review_user_session")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
        assert_eq!(
            store.load(UserId(42)).await.unwrap().unwrap().state,
            SessionState::Comment
        );
    }

    #[tokio::test]
    async fn test_state_is_stored_as_text() {
        let pool = test_pool().await;
        let store = SqliteSessionStore::new(pool.clone());
        let mut data = SessionData::initial(UserId(7));
        data.state = SessionState::Comment;
        store.save(&data).await.unwrap();

        let state: (String,) =
            sqlx::query_as("SELECT state FROM review_user_session WHERE tg_user_id = 7")
                .fetch_one(&pool.reader)
                .await
                .unwrap();
        assert_eq!(state.0, "comment");
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let store = SqliteSessionStore::new(test_pool().await);
        let mut alice = SessionData::initial(UserId(1));
        alice.phone_number = "111".to_string();
        let bob = SessionData::initial(UserId(2));

        store.save(&alice).await.unwrap();
        store.save(&bob).await.unwrap();

        assert_eq!(store.load(UserId(1)).await.unwrap(), Some(alice));
        assert_eq!(store.load(UserId(2)).await.unwrap(), Some(bob));
    }
}
