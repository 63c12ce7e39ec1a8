//! Outbound replies.
//!
//! The session core decides *which* reply to send; the transport adapter
//! decides how it reads. Keeping replies as a closed enum keeps text rendering
//! out of the core.

use serde::{Deserialize, Serialize};

use crate::session::ChatId;

/// A logical reply the bot can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    /// Greeting listing the commands; optionally asks for a phone number.
    Help { request_phone: bool },
    /// Phone number stored from the user's own contact.
    PhoneBound,
    /// The shared contact belongs to someone else.
    UseOwnContact,
    /// Text started with the command prefix but matched no command.
    UnknownCommand,
    /// Submission started.
    StartComment,
    /// Content accepted, continue or finish.
    ResumeComment,
    /// Content had no text and no supported media.
    SendValidComment,
    /// Submission finished.
    FinishComment,
    /// Something failed while handling the message.
    RetryLater,
}

/// Keyboard affordance attached to a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMarkup {
    #[default]
    None,
    /// One-time keyboard with a single share-contact button.
    RequestContact,
    /// Remove any keyboard previously shown.
    RemoveKeyboard,
}

/// A reply addressed to a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub reply: Reply,
    #[serde(default)]
    pub markup: ReplyMarkup,
}

impl OutboundMessage {
    /// A reply with no keyboard changes.
    pub fn new(chat_id: ChatId, reply: Reply) -> Self {
        Self {
            chat_id,
            reply,
            markup: ReplyMarkup::None,
        }
    }

    /// Attach a keyboard affordance.
    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.markup = markup;
        self
    }
}

/// Transport acknowledgement for a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Transport-assigned id of the sent message.
    pub message_id: i64,
}
