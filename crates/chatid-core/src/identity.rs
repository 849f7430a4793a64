//! Canonical resolved subject of a request
//!
//! `Identity` is a sum type so that "hidden sender" can never carry an id
//! and every other kind always does

use chatid_telegram::types::{Chat, ChatType};

/// Display name substituted for a deleted person with no remaining name.
pub const DELETED_ACCOUNT: &str = "Deleted Account";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Person { id: i64, name: String },
    Bot { id: i64, name: String },
    Group { id: i64, title: String },
    Channel { id: i64, title: String },
    /// Forwarding party who chose not to disclose their account; only a
    /// free-text name is available.
    Hidden { name: String },
}

impl Identity {
    /// Identity of a chat as reported by the Bot API. Private chats are
    /// persons (the API does not mark bot accounts on the chat object);
    /// unrecognized chat types resolve to nothing.
    pub fn from_chat(chat: &Chat) -> Option<Identity> {
        match chat.chat_type {
            ChatType::Private => Some(Identity::Person {
                id: chat.id,
                name: chat.display_name(),
            }),
            ChatType::Group | ChatType::Supergroup => Some(Identity::Group {
                id: chat.id,
                title: chat.display_name(),
            }),
            ChatType::Channel => Some(Identity::Channel {
                id: chat.id,
                title: chat.display_name(),
            }),
            ChatType::Unknown => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Identity::Person { id, .. }
            | Identity::Bot { id, .. }
            | Identity::Group { id, .. }
            | Identity::Channel { id, .. } => Some(*id),
            Identity::Hidden { .. } => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Identity::Person { name, .. }
            | Identity::Bot { name, .. }
            | Identity::Hidden { name } => name,
            Identity::Group { title, .. } | Identity::Channel { title, .. } => title,
        }
    }
}

/// Outcome of resolving one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single concrete subject.
    Identity(Identity),
    /// Pre-rendered text, used when no single identity applies (shared
    /// peer batches, degraded lookups).
    Text(String),
    /// The event carries none of the recognized origin shapes; decline
    /// silently.
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(id: i64, chat_type: &str, title: Option<&str>) -> Chat {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "type": chat_type,
            "title": title,
        }))
        .expect("chat")
    }

    #[test]
    fn hidden_identity_never_has_an_id() {
        let hidden = Identity::Hidden {
            name: "Anonymous123".to_string(),
        };
        assert_eq!(hidden.id(), None);
        assert_eq!(hidden.display_name(), "Anonymous123");
    }

    #[test]
    fn concrete_kinds_always_carry_their_id() {
        for identity in [
            Identity::Person {
                id: 1,
                name: "Ann".to_string(),
            },
            Identity::Bot {
                id: 2,
                name: "HelperBot".to_string(),
            },
            Identity::Group {
                id: -100123,
                title: "Club".to_string(),
            },
            Identity::Channel {
                id: -100456,
                title: "News".to_string(),
            },
        ] {
            assert!(identity.id().is_some());
        }
    }

    #[test]
    fn from_chat_maps_each_chat_type() {
        assert!(matches!(
            Identity::from_chat(&chat(1, "private", None)),
            Some(Identity::Person { .. })
        ));
        assert!(matches!(
            Identity::from_chat(&chat(-2, "group", Some("Old Group"))),
            Some(Identity::Group { .. })
        ));
        assert!(matches!(
            Identity::from_chat(&chat(-100321, "supergroup", Some("Big Group"))),
            Some(Identity::Group { .. })
        ));
        assert!(matches!(
            Identity::from_chat(&chat(-100654, "channel", Some("News"))),
            Some(Identity::Channel { .. })
        ));
        assert_eq!(Identity::from_chat(&chat(9, "wat", None)), None);
    }

    #[test]
    fn empty_display_name_is_preserved() {
        let person = Identity::Person {
            id: 5,
            name: String::new(),
        };
        assert_eq!(person.display_name(), "");
    }
}
