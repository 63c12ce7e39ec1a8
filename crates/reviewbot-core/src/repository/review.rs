//! Review store trait definition.

use reviewbot_types::error::RepositoryError;
use reviewbot_types::review::ReviewContent;
use reviewbot_types::session::UserId;

/// Append-only store for submitted review content.
pub trait ReviewStore: Send + Sync {
    /// Append one submission record for a user.
    fn store(
        &self,
        user_id: UserId,
        content: &ReviewContent,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
