//! Origin resolvers
//!
//! One extraction rule per recognized input shape. Each resolver is a pure
//! function from wire types to a [`Resolution`]; the lookup-based shapes
//! (usernames, mentions) are handled by the orchestrator because they need
//! the transport

use chatid_i18n::{render, text, Language, TextKey};
use chatid_telegram::types::{
    ChatShared, Contact, EntityType, Message, MessageEntity, MessageOrigin, Story, User,
    UsersShared,
};

use crate::identity::{Identity, Resolution, DELETED_ACCOUNT};

pub fn person_or_bot(user: &User) -> Identity {
    if user.is_bot {
        Identity::Bot {
            id: user.id,
            name: user.full_name(),
        }
    } else {
        Identity::Person {
            id: user.id,
            name: user.full_name(),
        }
    }
}

/// Like [`person_or_bot`], but substitutes the deleted-account marker when
/// nothing of the name remains. Used where the API hands us a full user
/// object (replies, text mentions), not for forward origins — a deleted
/// forwarder surfaces as a hidden origin instead.
pub fn person_or_bot_deleted_aware(user: &User) -> Identity {
    let identity = person_or_bot(user);
    match identity {
        Identity::Person { id, name } if name.is_empty() => Identity::Person {
            id,
            name: DELETED_ACCOUNT.to_string(),
        },
        other => other,
    }
}

/// Forward origins and external replies share the same four sub-cases.
pub fn from_forward_origin(origin: &MessageOrigin) -> Identity {
    match origin {
        MessageOrigin::User { sender_user } => person_or_bot(sender_user),
        MessageOrigin::HiddenUser { sender_user_name } => Identity::Hidden {
            name: sender_user_name.clone(),
        },
        MessageOrigin::Chat { sender_chat } => Identity::Group {
            id: sender_chat.id,
            title: sender_chat.display_name(),
        },
        MessageOrigin::Channel { chat } => Identity::Channel {
            id: chat.id,
            title: chat.display_name(),
        },
    }
}

/// Reply to a message in the same conversation: the subject is whoever
/// sent the replied-to message.
pub fn from_reply_to_message(reply: &Message) -> Resolution {
    if let Some(user) = &reply.from {
        return Resolution::Identity(person_or_bot_deleted_aware(user));
    }
    if let Some(chat) = &reply.sender_chat {
        if let Some(identity) = Identity::from_chat(chat) {
            return Resolution::Identity(identity);
        }
    }
    Resolution::NoMatch
}

/// Stories are owned by a user or by a group/channel; other owner chat
/// types are not recognized.
pub fn from_story(story: &Story) -> Resolution {
    match Identity::from_chat(&story.chat) {
        Some(identity) => Resolution::Identity(identity),
        None => Resolution::NoMatch,
    }
}

pub fn from_contact(contact: &Contact, lang: Language) -> Resolution {
    match contact.user_id {
        Some(id) => Resolution::Identity(Identity::Person {
            id,
            name: contact.full_name(),
        }),
        None => Resolution::Text(text(TextKey::NotHaveId, lang).to_string()),
    }
}

/// Users handed over through a request-users button. Exactly one user
/// yields an identity; a batch yields one pre-rendered line per user.
pub fn from_users_shared(shared: &UsersShared, lang: Language) -> Resolution {
    match shared.users.as_slice() {
        [] => Resolution::NoMatch,
        [user] => Resolution::Identity(Identity::Person {
            id: user.user_id,
            name: user.full_name(),
        }),
        users => {
            let lines: String = users
                .iter()
                .map(|user| format!("\n`{}` • {}", user.user_id, user.full_name()))
                .collect();
            Resolution::Text(render(text(TextKey::IdUsers, lang), &[&lines]))
        }
    }
}

/// Chats handed over through a request-chat button. The added-to-group
/// request id never reaches this resolver; the orchestrator intercepts it
/// first because it carries a side effect.
pub fn from_chats_shared(shared: &ChatShared, lang: Language) -> Resolution {
    match shared.chats.as_slice() {
        [] => Resolution::NoMatch,
        [chat] => Resolution::Identity(Identity::Group {
            id: chat.chat_id,
            title: chat.title.clone().unwrap_or_default(),
        }),
        chats => {
            let lines: String = chats
                .iter()
                .map(|chat| {
                    format!(
                        "\n{} • `{}`",
                        chat.title.as_deref().unwrap_or_default(),
                        chat.chat_id
                    )
                })
                .collect();
            Resolution::Text(render(text(TextKey::IdChannelsOrGroups, lang), &[&lines]))
        }
    }
}

/// A reference to a user inside message text: either a handle that still
/// needs a lookup, or a text mention carrying the user inline.
#[derive(Debug, Clone, PartialEq)]
pub enum MentionRef<'a> {
    Handle(String),
    Direct(&'a User),
}

/// First mention-like entity of the message, in entity order.
pub fn first_mention(msg: &Message) -> Option<MentionRef<'_>> {
    let text = msg.text.as_deref().unwrap_or_default();
    for entity in &msg.entities {
        match entity.entity_type {
            EntityType::Mention => {
                return Some(MentionRef::Handle(entity_slice(text, entity)));
            }
            EntityType::TextMention => {
                if let Some(user) = &entity.user {
                    return Some(MentionRef::Direct(user));
                }
            }
            _ => continue,
        }
    }
    None
}

pub fn has_mentions(msg: &Message) -> bool {
    msg.entities.iter().any(|entity| {
        matches!(
            entity.entity_type,
            EntityType::Mention | EntityType::TextMention
        )
    })
}

fn entity_slice(text: &str, entity: &MessageEntity) -> String {
    text.chars()
        .skip(entity.offset)
        .take(entity.length)
        .collect()
}

/// Pull a bare username out of free text: an `@handle` or a `t.me` link.
/// Anything else is not treated as a lookup request.
pub fn extract_username(input: &str) -> Option<String> {
    let token = input.trim().split_whitespace().next()?;

    let token = token
        .strip_prefix("https://")
        .or_else(|| token.strip_prefix("http://"))
        .unwrap_or(token);

    let candidate = if let Some(rest) = token
        .strip_prefix("t.me/")
        .or_else(|| token.strip_prefix("telegram.me/"))
        .or_else(|| token.strip_prefix("telegram.dog/"))
    {
        rest.split(['/', '?']).next().unwrap_or_default()
    } else if let Some(rest) = token.strip_prefix('@') {
        rest
    } else {
        return None;
    };

    is_valid_username(candidate).then(|| candidate.to_string())
}

fn is_valid_username(username: &str) -> bool {
    (4..=32).contains(&username.len())
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && username
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatid_telegram::types::MessageOrigin;

    fn user(id: i64, first: &str, is_bot: bool) -> User {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "first_name": first,
            "is_bot": is_bot,
        }))
        .expect("user")
    }

    #[test]
    fn forward_from_hidden_sender_keeps_only_the_name() {
        let origin: MessageOrigin = serde_json::from_value(serde_json::json!({
            "type": "hidden_user",
            "sender_user_name": "Anonymous123",
        }))
        .expect("origin");

        let identity = from_forward_origin(&origin);
        assert_eq!(identity.id(), None);
        assert_eq!(identity.display_name(), "Anonymous123");
    }

    #[test]
    fn forward_from_user_yields_person_or_bot() {
        let origin: MessageOrigin = serde_json::from_value(serde_json::json!({
            "type": "user",
            "sender_user": {"id": 7, "first_name": "Ann", "is_bot": false},
        }))
        .expect("origin");
        assert!(matches!(
            from_forward_origin(&origin),
            Identity::Person { id: 7, .. }
        ));

        let origin: MessageOrigin = serde_json::from_value(serde_json::json!({
            "type": "user",
            "sender_user": {"id": 8, "first_name": "Helper", "is_bot": true},
        }))
        .expect("origin");
        assert!(matches!(
            from_forward_origin(&origin),
            Identity::Bot { id: 8, .. }
        ));
    }

    #[test]
    fn reply_to_deleted_account_substitutes_the_marker() {
        let reply: Message = serde_json::from_value(serde_json::json!({
            "message_id": 2,
            "chat": {"id": 1, "type": "private"},
            "from": {"id": 77, "first_name": ""},
        }))
        .expect("message");

        match from_reply_to_message(&reply) {
            Resolution::Identity(Identity::Person { id, name }) => {
                assert_eq!(id, 77);
                assert_eq!(name, DELETED_ACCOUNT);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn reply_from_sender_chat_branches_on_chat_type() {
        let reply: Message = serde_json::from_value(serde_json::json!({
            "message_id": 2,
            "chat": {"id": -100, "type": "supergroup"},
            "sender_chat": {"id": -100555, "type": "channel", "title": "News"},
        }))
        .expect("message");

        assert!(matches!(
            from_reply_to_message(&reply),
            Resolution::Identity(Identity::Channel { id: -100555, .. })
        ));
    }

    #[test]
    fn reply_with_no_sender_resolves_to_nothing() {
        let reply: Message = serde_json::from_value(serde_json::json!({
            "message_id": 2,
            "chat": {"id": 1, "type": "private"},
        }))
        .expect("message");
        assert_eq!(from_reply_to_message(&reply), Resolution::NoMatch);
    }

    #[test]
    fn story_from_unsupported_owner_type_is_no_match() {
        let story: Story = serde_json::from_value(serde_json::json!({
            "id": 1,
            "chat": {"id": 5, "type": "something_else"},
        }))
        .expect("story");
        assert_eq!(from_story(&story), Resolution::NoMatch);
    }

    #[test]
    fn contact_without_account_degrades_to_text() {
        let contact: Contact = serde_json::from_value(serde_json::json!({
            "phone_number": "+123",
            "first_name": "Paper",
        }))
        .expect("contact");

        match from_contact(&contact, Language::English) {
            Resolution::Text(text) => assert!(!text.is_empty()),
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn single_shared_user_is_an_identity_many_are_text() {
        let one: UsersShared = serde_json::from_value(serde_json::json!({
            "request_id": 1,
            "users": [{"user_id": 11, "first_name": "Ann"}],
        }))
        .expect("shared");
        assert!(matches!(
            from_users_shared(&one, Language::English),
            Resolution::Identity(Identity::Person { id: 11, .. })
        ));

        let many: UsersShared = serde_json::from_value(serde_json::json!({
            "request_id": 1,
            "users": [
                {"user_id": 11, "first_name": "Ann"},
                {"user_id": 12, "first_name": "Ben"},
            ],
        }))
        .expect("shared");
        match from_users_shared(&many, Language::English) {
            Resolution::Text(text) => {
                assert!(text.contains("`11` • Ann"));
                assert!(text.contains("`12` • Ben"));
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn mention_entity_is_sliced_by_character_offsets() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "message_id": 1,
            "chat": {"id": -100, "type": "supergroup"},
            "text": "ask @someone about it",
            "entities": [{"type": "mention", "offset": 4, "length": 8}],
        }))
        .expect("message");

        assert_eq!(
            first_mention(&msg),
            Some(MentionRef::Handle("@someone".to_string()))
        );
    }

    #[test]
    fn text_mention_carries_the_user_inline() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "message_id": 1,
            "chat": {"id": -100, "type": "supergroup"},
            "text": "ask Ann",
            "entities": [{
                "type": "text_mention",
                "offset": 4,
                "length": 3,
                "user": {"id": 44, "first_name": "Ann"},
            }],
        }))
        .expect("message");

        match first_mention(&msg) {
            Some(MentionRef::Direct(user)) => assert_eq!(user.id, 44),
            other => panic!("unexpected mention: {:?}", other),
        }
    }

    #[test]
    fn extract_username_accepts_handles_and_links_only() {
        assert_eq!(extract_username("@durov"), Some("durov".to_string()));
        assert_eq!(extract_username("t.me/durov"), Some("durov".to_string()));
        assert_eq!(
            extract_username("https://t.me/durov?start=x"),
            Some("durov".to_string())
        );
        assert_eq!(extract_username("hello there"), None);
        assert_eq!(extract_username("@ab"), None);
        assert_eq!(extract_username("t.me/+AbCdEfG"), None);
    }

    #[test]
    fn person_or_bot_does_not_substitute_names() {
        let deleted = user(9, "", false);
        assert_eq!(person_or_bot(&deleted).display_name(), "");
        assert_eq!(
            person_or_bot_deleted_aware(&deleted).display_name(),
            DELETED_ACCOUNT
        );
    }
}
