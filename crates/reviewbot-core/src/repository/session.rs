//! Session state store trait definition.

use reviewbot_types::error::RepositoryError;
use reviewbot_types::session::{SessionData, UserId};

/// Durable per-user session state.
///
/// Implementations live in reviewbot-infra (e.g., SqliteSessionStore).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait SessionStore: Send + Sync {
    /// Load a user's session. Returns None if the user has no stored row.
    fn load(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<SessionData>, RepositoryError>> + Send;

    /// Store a user's session (upsert, overwriting any existing row).
    fn save(
        &self,
        data: &SessionData,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
