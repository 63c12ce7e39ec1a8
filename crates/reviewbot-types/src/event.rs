//! Inbound chat events.
//!
//! The transport adapter converts whatever its wire format delivers into an
//! [`InboundEvent`]. The payload is a closed set of kinds so the session actor
//! can handle it with an exhaustive `match` instead of probing optional fields.

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::session::{ChatId, UserId};

/// Prefix that marks a text message as a bot command.
pub const COMMAND_PREFIX: char = '/';

/// One event received from the chat transport.
///
/// `sender` and `chat_id` are optional because the transport may deliver
/// updates without them (e.g. channel posts). Such events are rejected at
/// dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub sender: Option<Sender>,
    pub chat_id: Option<ChatId>,
    pub payload: Payload,
}

/// An inbound event with its routing identity verified.
///
/// This is what a session inbox carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub sender: Sender,
    pub chat_id: ChatId,
    pub payload: Payload,
}

impl TryFrom<InboundEvent> for SessionEvent {
    type Error = DispatchError;

    fn try_from(event: InboundEvent) -> Result<Self, Self::Error> {
        let sender = event.sender.ok_or(DispatchError::MissingSender)?;
        let chat_id = event.chat_id.ok_or(DispatchError::MissingChat)?;
        Ok(Self {
            sender,
            chat_id,
            payload: event.payload,
        })
    }
}

/// The user who sent an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: UserId,
    #[serde(default)]
    pub first_name: String,
}

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Plain text, including commands.
    Text { text: String },
    /// A shared contact card.
    Contact(Contact),
    /// One or more media attachments with an optional caption.
    Media(MediaMessage),
    /// Anything the bot does not understand (stickers, locations, ...).
    Unsupported,
}

impl Payload {
    /// Shorthand for a text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text { text: text.into() }
    }
}

/// A contact card shared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The chat user the contact belongs to, if it is a chat user at all.
    pub user_id: Option<UserId>,
    pub phone_number: String,
}

/// A message carrying media attachments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMessage {
    #[serde(default)]
    pub caption: Option<String>,
    /// Every size variant the transport offers for a single image.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub video: Option<FileRef>,
    #[serde(default)]
    pub audio: Option<FileRef>,
    #[serde(default)]
    pub voice: Option<FileRef>,
}

impl MediaMessage {
    /// The highest-fidelity image variant, by pixel area then file size.
    ///
    /// Ties resolve to the variant listed last.
    pub fn best_photo(&self) -> Option<&PhotoSize> {
        self.photo.iter().max_by_key(|p| {
            (
                u64::from(p.width) * u64::from(p.height),
                p.file_size.unwrap_or(0),
            )
        })
    }

    /// At most one media reference per attachment kind, in a fixed order:
    /// image, video, audio, voice.
    pub fn media_refs(&self) -> Vec<MediaRef> {
        let mut refs = Vec::new();
        if let Some(photo) = self.best_photo() {
            refs.push(MediaRef {
                kind: MediaKind::Image,
                file_id: photo.file_id.clone(),
            });
        }
        let others = [
            (MediaKind::Video, &self.video),
            (MediaKind::Audio, &self.audio),
            (MediaKind::Voice, &self.voice),
        ];
        for (kind, file) in others {
            if let Some(file) = file {
                refs.push(MediaRef {
                    kind,
                    file_id: file.file_id.clone(),
                });
            }
        }
        refs
    }

    /// Caption text, empty when absent.
    pub fn caption_text(&self) -> &str {
        self.caption.as_deref().unwrap_or_default()
    }
}

/// One size variant of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Reference to a non-image file held by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

/// Supported attachment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Voice,
}

/// A media attachment awaiting URL resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

/// A bot command recognised in a text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` -- show the greeting.
    Start,
    /// `/comment` -- begin a submission.
    Comment,
    /// `/finish` -- finish a submission.
    Finish,
    /// Starts with the command prefix but is not a known command.
    Unknown(String),
}

impl Command {
    /// Parse a text message as a command.
    ///
    /// Matching is exact and case-sensitive. Returns `None` for text that does
    /// not start with [`COMMAND_PREFIX`].
    pub fn parse(text: &str) -> Option<Self> {
        if !text.starts_with(COMMAND_PREFIX) {
            return None;
        }
        Some(match text {
            "/start" => Command::Start,
            "/comment" => Command::Comment,
            "/finish" => Command::Finish,
            other => Command::Unknown(other.to_string()),
        })
    }
}
