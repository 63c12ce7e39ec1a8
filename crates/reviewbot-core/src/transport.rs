//! Chat transport trait definition.

use reviewbot_types::error::TransportError;
use reviewbot_types::reply::{Delivery, OutboundMessage};

/// Outbound side of the chat transport.
///
/// The session core calls this for every reply and for media lookups.
/// Delivery is attempted once; callers log failures and do not retry.
pub trait Transport: Send + Sync {
    /// Deliver a reply to its chat.
    fn send(
        &self,
        message: &OutboundMessage,
    ) -> impl std::future::Future<Output = Result<Delivery, TransportError>> + Send;

    /// Resolve an attachment reference to a fetchable URL.
    fn resolve_media_url(
        &self,
        file_id: &str,
    ) -> impl std::future::Future<Output = Result<String, TransportError>> + Send;
}
