//! Text and keyboard composition
//!
//! Turns a resolved identity plus a language into the outbound text and
//! the optional deep-link button. Also builds the request keyboards the
//! bot offers in private chats

use chatid_i18n::{render, text, Language, TextKey};
use chatid_telegram::types::{
    ChatAdministratorRights, InlineKeyboardButton, KeyboardButton, KeyboardButtonRequestChat,
    KeyboardButtonRequestUsers, ReplyKeyboardMarkup, ReplyMarkup,
};

use crate::dispatch::RequestKind;
use crate::identity::Identity;

/// Localized answer for a single identity. Template choice depends only
/// on the kind; hidden identities never render an id token.
pub fn identity_text(identity: &Identity, lang: Language) -> String {
    match identity {
        Identity::Person { id, name } | Identity::Bot { id, name } => {
            render(text(TextKey::IdUser, lang), &[name, &id.to_string()])
        }
        Identity::Group { id, title } | Identity::Channel { id, title } => render(
            text(TextKey::IdChannelOrGroup, lang),
            &[title, &id.to_string()],
        ),
        Identity::Hidden { name } => render(text(TextKey::IdHidden, lang), &[name]),
    }
}

/// Terse single-line form used inside groups, where answers are not
/// localized. Empty names compose to nothing rather than a bare id.
pub fn terse_line(identity: &Identity) -> Option<String> {
    let name = identity.display_name();
    if name.is_empty() {
        return None;
    }
    match identity.id() {
        Some(id) => Some(format!("{} • `{}`", name, id)),
        None => Some(name.to_string()),
    }
}

/// The "open this chat" affordance. Only a single concrete id gets one.
pub fn deep_link_markup(
    bot_username: &str,
    chat_id: Option<i64>,
    lang: Language,
) -> Option<ReplyMarkup> {
    let chat_id = chat_id?;
    Some(ReplyMarkup::inline(vec![vec![InlineKeyboardButton::url(
        text(TextKey::ButtonGetLink, lang),
        format!("https://t.me/{}?start=link_{}", bot_username, chat_id),
    )]]))
}

/// Branding row attached to inline-query answers.
pub fn powered_by_markup(bot_username: &str) -> ReplyMarkup {
    ReplyMarkup::inline(vec![vec![InlineKeyboardButton::url(
        "Powered by Chat ID Bot 🪪",
        format!("https://t.me/{}?start=start", bot_username),
    )]])
}

/// Private link into a supergroup or channel: the `-100` marker prefix is
/// not part of the address Telegram clients expect.
pub fn supergroup_link(chat_id: i64) -> String {
    let raw = chat_id.to_string();
    let internal = raw.strip_prefix("-100").unwrap_or(&raw).to_string();
    format!("https://t.me/c/{}/1000000000", internal)
}

/// Buttons answering `/link <id>`: one web link for supergroup-style ids,
/// per-platform app links for user ids.
pub fn chat_link_markup(target: &str) -> ReplyMarkup {
    if target.starts_with("-100") {
        let id: i64 = target.parse().unwrap_or_default();
        ReplyMarkup::inline(vec![vec![InlineKeyboardButton::url(
            "Link 🔗",
            supergroup_link(id),
        )]])
    } else {
        ReplyMarkup::inline(vec![vec![
            InlineKeyboardButton::url(
                "Android 📱",
                format!("tg://openmessage?user_id={}", target),
            ),
            InlineKeyboardButton::url("iOS 🔗", format!("tg://user?id={}", target)),
        ]])
    }
}

fn request_users_button(label: &str, kind: RequestKind, is_bot: bool) -> KeyboardButton {
    KeyboardButton {
        text: label.to_string(),
        request_users: Some(KeyboardButtonRequestUsers {
            request_id: kind.id(),
            user_is_bot: Some(is_bot),
            max_quantity: Some(1),
            request_name: Some(true),
        }),
        request_chat: None,
    }
}

fn request_chat_button(
    label: &str,
    kind: RequestKind,
    is_channel: bool,
    user_rights: Option<ChatAdministratorRights>,
) -> KeyboardButton {
    KeyboardButton {
        text: label.to_string(),
        request_users: None,
        request_chat: Some(KeyboardButtonRequestChat {
            request_id: kind.id(),
            chat_is_channel: is_channel,
            request_title: Some(true),
            request_username: None,
            user_administrator_rights: user_rights,
            bot_administrator_rights: None,
        }),
    }
}

/// The four share buttons offered by /start.
pub fn welcome_keyboard(lang: Language) -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![
            vec![
                request_users_button(text(TextKey::UserButton, lang), RequestKind::User, false),
                request_users_button(text(TextKey::BotButton, lang), RequestKind::Bot, true),
            ],
            vec![
                request_chat_button(
                    text(TextKey::GroupButton, lang),
                    RequestKind::Group,
                    false,
                    None,
                ),
                request_chat_button(
                    text(TextKey::ChannelButton, lang),
                    RequestKind::Channel,
                    true,
                    None,
                ),
            ],
        ],
        resize_keyboard: true,
        input_field_placeholder: Some(text(TextKey::ChoseChatType, lang).to_string()),
    })
}

/// Variant of the share keyboard restricted to chats the requester
/// administers.
pub fn manager_keyboard(lang: Language) -> ReplyMarkup {
    let manage_rights = || {
        Some(ChatAdministratorRights {
            can_manage_chat: Some(true),
            ..Default::default()
        })
    };
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![vec![
            request_chat_button(
                text(TextKey::GroupButton, lang),
                RequestKind::Group,
                false,
                manage_rights(),
            ),
            request_chat_button(
                text(TextKey::ChannelButton, lang),
                RequestKind::Channel,
                true,
                manage_rights(),
            ),
        ]],
        resize_keyboard: true,
        input_field_placeholder: Some(text(TextKey::ChoseChatType, lang).to_string()),
    })
}

/// Single button asking the user to pick a group the bot should join.
pub fn add_to_group_keyboard(lang: Language) -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![vec![KeyboardButton {
            text: text(TextKey::ButtonAddBotToGroup, lang).to_string(),
            request_users: None,
            request_chat: Some(KeyboardButtonRequestChat {
                request_id: RequestKind::AddToGroup.id(),
                chat_is_channel: false,
                request_title: Some(true),
                request_username: Some(true),
                user_administrator_rights: Some(ChatAdministratorRights {
                    can_manage_chat: Some(true),
                    can_promote_members: Some(true),
                    can_invite_users: Some(true),
                }),
                bot_administrator_rights: Some(ChatAdministratorRights {
                    can_manage_chat: Some(true),
                    ..Default::default()
                }),
            }),
        }]],
        resize_keyboard: true,
        input_field_placeholder: None,
    })
}

/// Language chooser rows for /lang.
pub fn language_keyboard() -> ReplyMarkup {
    ReplyMarkup::inline(vec![
        vec![InlineKeyboardButton::callback("English 🇬🇧", "lang:en")],
        vec![InlineKeyboardButton::callback("עברית 🇮🇱", "lang:he")],
        vec![InlineKeyboardButton::callback("Русский 🇷🇺", "lang:ru")],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composing_twice_is_byte_identical() {
        let identity = Identity::Person {
            id: 123,
            name: "Ann".to_string(),
        };
        assert_eq!(
            identity_text(&identity, Language::Hebrew),
            identity_text(&identity, Language::Hebrew)
        );
    }

    #[test]
    fn hidden_identity_text_has_no_id_token() {
        let identity = Identity::Hidden {
            name: "Anonymous123".to_string(),
        };
        let rendered = identity_text(&identity, Language::English);
        assert!(rendered.contains("Anonymous123"));
        assert!(!rendered.contains('`'));
    }

    #[test]
    fn person_and_bot_share_a_template() {
        let person = Identity::Person {
            id: 5,
            name: "Ann".to_string(),
        };
        let bot = Identity::Bot {
            id: 5,
            name: "Ann".to_string(),
        };
        assert_eq!(
            identity_text(&person, Language::English),
            identity_text(&bot, Language::English)
        );
    }

    #[test]
    fn no_deep_link_without_an_id() {
        assert!(deep_link_markup("chatid_bot", None, Language::English).is_none());
        assert!(deep_link_markup("chatid_bot", Some(5), Language::English).is_some());
    }

    #[test]
    fn supergroup_link_strips_the_marker_prefix() {
        assert_eq!(
            supergroup_link(-1001234567),
            "https://t.me/c/1234567/1000000000"
        );
        // plain group ids keep their sign
        assert_eq!(supergroup_link(-999), "https://t.me/c/-999/1000000000");
    }

    #[test]
    fn terse_line_declines_on_empty_name() {
        let unnamed = Identity::Person {
            id: 3,
            name: String::new(),
        };
        assert_eq!(terse_line(&unnamed), None);

        let named = Identity::Group {
            id: -100777,
            title: "Club".to_string(),
        };
        assert_eq!(terse_line(&named), Some("Club • `-100777`".to_string()));

        let hidden = Identity::Hidden {
            name: "Anon".to_string(),
        };
        assert_eq!(terse_line(&hidden), Some("Anon".to_string()));
    }

    #[test]
    fn chat_link_markup_branches_on_supergroup_prefix() {
        let group = serde_json::to_value(chat_link_markup("-1001234")).expect("serialize");
        let buttons = group["inline_keyboard"][0].as_array().expect("row");
        assert_eq!(buttons.len(), 1);
        assert!(buttons[0]["url"]
            .as_str()
            .expect("url")
            .contains("t.me/c/1234"));

        let user = serde_json::to_value(chat_link_markup("12345")).expect("serialize");
        let buttons = user["inline_keyboard"][0].as_array().expect("row");
        assert_eq!(buttons.len(), 2);
        assert!(buttons[0]["url"]
            .as_str()
            .expect("url")
            .starts_with("tg://openmessage"));
    }
}
