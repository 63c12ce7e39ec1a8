//! Telegram Bot API types.
//!
//! Only the subset of the Bot API the review bot consumes. These are
//! Telegram-specific wire structures; `InboundEvent` and friends in
//! reviewbot-types are the transport-agnostic side.

use serde::{Deserialize, Serialize};

use reviewbot_types::error::TransportError;
use reviewbot_types::event::{
    COMMAND_PREFIX, Contact, FileRef, InboundEvent, MediaMessage, Payload, PhotoSize, Sender,
};
use reviewbot_types::session::{ChatId, UserId};

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Envelope every Bot API method responds with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the `result`, mapping `ok: false` to [`TransportError::Api`].
    pub fn into_result(self) -> Result<T, TransportError> {
        if !self.ok {
            return Err(TransportError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
            });
        }
        self.result
            .ok_or_else(|| TransportError::Decode("response has no result".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One incoming update (`getUpdates` item or webhook body).
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub contact: Option<TgContact>,
    #[serde(default)]
    pub photo: Option<Vec<TgPhotoSize>>,
    #[serde(default)]
    pub video: Option<TgFileRef>,
    #[serde(default)]
    pub audio: Option<TgFileRef>,
    #[serde(default)]
    pub voice: Option<TgFileRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgContact {
    pub phone_number: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgPhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Video, audio and voice objects; only the file id is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct TgFileRef {
    pub file_id: String,
}

/// Result of `getFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct TgFile {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl From<Update> for InboundEvent {
    fn from(update: Update) -> Self {
        match update.message {
            Some(message) => message.into(),
            None => InboundEvent {
                sender: None,
                chat_id: None,
                payload: Payload::Unsupported,
            },
        }
    }
}

impl From<Message> for InboundEvent {
    fn from(message: Message) -> Self {
        let sender = message.from.as_ref().map(|user| Sender {
            user_id: UserId(user.id),
            first_name: user.first_name.clone(),
        });
        let chat_id = Some(ChatId(message.chat.id));
        let payload = message.into_payload();

        InboundEvent {
            sender,
            chat_id,
            payload,
        }
    }
}

impl Message {
    /// Classify the message. Commands win over everything, then contacts,
    /// then media, then plain text.
    fn into_payload(self) -> Payload {
        let text = self.text.filter(|t| !t.is_empty());

        if let Some(text) = text.as_ref().filter(|t| t.starts_with(COMMAND_PREFIX)) {
            return Payload::Text { text: text.clone() };
        }

        if let Some(contact) = self.contact {
            return Payload::Contact(Contact {
                user_id: contact.user_id.map(UserId),
                phone_number: contact.phone_number,
            });
        }

        let photo = self.photo.unwrap_or_default();
        if !photo.is_empty() || self.video.is_some() || self.audio.is_some() || self.voice.is_some()
        {
            return Payload::Media(MediaMessage {
                caption: self.caption.filter(|c| !c.is_empty()).or(text),
                photo: photo
                    .into_iter()
                    .map(|p| PhotoSize {
                        file_id: p.file_id,
                        width: p.width,
                        height: p.height,
                        file_size: p.file_size,
                    })
                    .collect(),
                video: self.video.map(|f| FileRef { file_id: f.file_id }),
                audio: self.audio.map(|f| FileRef { file_id: f.file_id }),
                voice: self.voice.map(|f| FileRef { file_id: f.file_id }),
            });
        }

        match text {
            Some(text) => Payload::Text { text },
            None => Payload::Unsupported,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Body of `sendMessage`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<TgReplyMarkup>,
}

/// A formatted span of message text. Offsets and lengths are in UTF-16
/// code units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TgReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    pub one_time_keyboard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    pub request_contact: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

/// The sent message as echoed by `sendMessage`; only the id is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}
