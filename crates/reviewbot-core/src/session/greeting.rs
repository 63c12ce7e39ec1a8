//! Contextual help/greeting.

use reviewbot_types::reply::{OutboundMessage, Reply, ReplyMarkup};
use reviewbot_types::session::{ChatId, SessionData};

/// Build the greeting for a user's current session.
///
/// Users without a stored phone number are also asked to share their contact
/// and get the share-contact keyboard.
pub fn greeting(data: &SessionData, chat_id: ChatId) -> OutboundMessage {
    if data.needs_phone_number() {
        OutboundMessage::new(chat_id, Reply::Help { request_phone: true })
            .with_markup(ReplyMarkup::RequestContact)
    } else {
        OutboundMessage::new(chat_id, Reply::Help { request_phone: false })
    }
}
