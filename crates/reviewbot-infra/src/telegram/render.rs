//! Reply templates.
//!
//! Each [`Reply`] renders to plain text plus `bot_command` entities for the
//! commands it mentions, so Telegram clients show them as tappable.

use reviewbot_types::reply::{Reply, ReplyMarkup};

use super::types::{
    KeyboardButton, MessageEntity, ReplyKeyboardMarkup, ReplyKeyboardRemove, TgReplyMarkup,
};

const ENTITY_BOT_COMMAND: &str = "bot_command";

/// Label of the share-contact button.
pub const REQUEST_CONTACT_BUTTON: &str = "Provide phone number for better service";

enum Segment {
    Plain(&'static str),
    Command(&'static str),
}

use Segment::{Command, Plain};

const HELP: &[Segment] = &[
    Plain("Pleased to serve you.\n\n"),
    Command("/comment"),
    Plain(" - start to comment\n"),
    Command("/finish"),
    Plain(" - finish a comment"),
];

const PHONE_REQUEST: &[Segment] = &[Plain(
    "\n\nTo help us serve you better, you may provide you phone number to bind your RockShop account with telegram account.",
)];

const PHONE_BOUND: &[Segment] =
    &[Plain("Success! This telegram account is linked to your RockShop account.")];

const USE_OWN_CONTACT: &[Segment] =
    &[Plain("Provide your contact to update your phone_number, not other's")];

const UNKNOWN_COMMAND: &[Segment] = &[Plain("Unrecognized command. Say what?")];

const START_COMMENT: &[Segment] = &[Plain(
    "Please send your comment, you can send text, image, video, audio or voice.",
)];

const RESUME_COMMENT: &[Segment] = &[
    Plain("Your comment has been accepted, you can continue to add more, or use "),
    Command("/finish"),
    Plain(" to finish your comment"),
];

const SEND_VALID_COMMENT: &[Segment] = &[Plain("Please send text, image, video, audio or voice")];

const FINISH_COMMENT: &[Segment] = &[Plain("Thanks for your reply, happy to serve you.")];

const RETRY_LATER: &[Segment] = &[Plain("Unknown error occurred, please retry later")];

/// A reply ready for `sendMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub text: String,
    pub entities: Vec<MessageEntity>,
}

fn segments(reply: &Reply) -> Vec<&'static [Segment]> {
    match reply {
        Reply::Help {
            request_phone: false,
        } => vec![HELP],
        Reply::Help {
            request_phone: true,
        } => vec![HELP, PHONE_REQUEST],
        Reply::PhoneBound => vec![PHONE_BOUND],
        Reply::UseOwnContact => vec![USE_OWN_CONTACT],
        Reply::UnknownCommand => vec![UNKNOWN_COMMAND],
        Reply::StartComment => vec![START_COMMENT],
        Reply::ResumeComment => vec![RESUME_COMMENT],
        Reply::SendValidComment => vec![SEND_VALID_COMMENT],
        Reply::FinishComment => vec![FINISH_COMMENT],
        Reply::RetryLater => vec![RETRY_LATER],
    }
}

/// Render a reply to text and command entities.
pub fn render(reply: &Reply) -> RenderedText {
    let mut text = String::new();
    let mut entities = Vec::new();
    // Telegram measures entity offsets in UTF-16 code units.
    let mut offset = 0;

    for segment in segments(reply).into_iter().flatten() {
        let (part, is_command) = match segment {
            Plain(s) => (*s, false),
            Command(s) => (*s, true),
        };
        let length = part.encode_utf16().count();
        if is_command {
            entities.push(MessageEntity {
                kind: ENTITY_BOT_COMMAND.to_string(),
                offset,
                length,
            });
        }
        text.push_str(part);
        offset += length;
    }

    RenderedText { text, entities }
}

/// Render a reply to its plain text.
pub fn render_reply(reply: &Reply) -> String {
    render(reply).text
}

/// Map the transport-agnostic markup onto Telegram's keyboard objects.
pub fn render_markup(markup: ReplyMarkup) -> Option<TgReplyMarkup> {
    match markup {
        ReplyMarkup::None => None,
        ReplyMarkup::RequestContact => Some(TgReplyMarkup::Keyboard(ReplyKeyboardMarkup {
            keyboard: vec![vec![KeyboardButton {
                text: REQUEST_CONTACT_BUTTON.to_string(),
                request_contact: true,
            }]],
            resize_keyboard: true,
            one_time_keyboard: true,
        })),
        ReplyMarkup::RemoveKeyboard => Some(TgReplyMarkup::Remove(ReplyKeyboardRemove {
            remove_keyboard: true,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(offset: usize, length: usize) -> MessageEntity {
        MessageEntity {
            kind: "bot_command".to_string(),
            offset,
            length,
        }
    }

    #[test]
    fn test_help_text_and_entities() {
        let rendered = render(&Reply::Help {
            request_phone: false,
        });
        assert_eq!(
            rendered.text,
            "Pleased to serve you.\n\n/comment - start to comment\n/finish - finish a comment"
        );
        assert_eq!(rendered.entities, vec![entity(23, 8), entity(51, 7)]);
        for e in &rendered.entities {
            let command: String = rendered
                .text
                .encode_utf16()
                .skip(e.offset)
                .take(e.length)
                .map(|u| char::from_u32(u32::from(u)).unwrap())
                .collect();
            assert!(command.starts_with('/'));
        }
    }

    #[test]
    fn test_help_with_phone_request_appends_prompt() {
        let plain = render_reply(&Reply::Help {
            request_phone: false,
        });
        let with_phone = render(&Reply::Help {
            request_phone: true,
        });
        assert!(with_phone.text.starts_with(&plain));
        assert!(with_phone.text.ends_with(
            "\n\nTo help us serve you better, you may provide you phone number to bind your RockShop account with telegram account."
        ));
        assert_eq!(with_phone.entities.len(), 2);
    }

    #[test]
    fn test_resume_comment_marks_finish_command() {
        let rendered = render(&Reply::ResumeComment);
        assert_eq!(
            rendered.text,
            "Your comment has been accepted, you can continue to add more, or use /finish to finish your comment"
        );
        assert_eq!(rendered.entities, vec![entity(69, 7)]);
    }

    #[test]
    fn test_plain_replies_have_no_entities() {
        for reply in [
            Reply::PhoneBound,
            Reply::UseOwnContact,
            Reply::UnknownCommand,
            Reply::StartComment,
            Reply::SendValidComment,
            Reply::FinishComment,
            Reply::RetryLater,
        ] {
            let rendered = render(&reply);
            assert!(!rendered.text.is_empty());
            assert!(rendered.entities.is_empty(), "{reply:?}");
        }
        assert_eq!(
            render_reply(&Reply::RetryLater),
            "Unknown error occurred, please retry later"
        );
        assert_eq!(
            render_reply(&Reply::UnknownCommand),
            "Unrecognized command. Say what?"
        );
    }

    #[test]
    fn test_request_contact_markup() {
        let markup = render_markup(ReplyMarkup::RequestContact).unwrap();
        assert_eq!(
            serde_json::to_value(&markup).unwrap(),
            serde_json::json!({
                "keyboard": [[{"text": REQUEST_CONTACT_BUTTON, "request_contact": true}]],
                "resize_keyboard": true,
                "one_time_keyboard": true
            })
        );
        assert!(render_markup(ReplyMarkup::None).is_none());
    }
}
