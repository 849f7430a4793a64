//! Bot API wire types
//!
//! Only the fields this bot reads are modeled; everything else is ignored
//! by serde

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub business_message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
    #[serde(default)]
    pub inline_query: Option<InlineQuery>,
    #[serde(default)]
    pub my_chat_member: Option<ChatMemberUpdated>,
    #[serde(default)]
    pub business_connection: Option<BusinessConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub sender_chat: Option<Chat>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub forward_origin: Option<MessageOrigin>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default)]
    pub external_reply: Option<ExternalReply>,
    #[serde(default)]
    pub reply_to_story: Option<Story>,
    #[serde(default)]
    pub story: Option<Story>,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub users_shared: Option<UsersShared>,
    #[serde(default)]
    pub chat_shared: Option<ChatShared>,
    #[serde(default)]
    pub via_bot: Option<User>,
    #[serde(default)]
    pub business_connection_id: Option<String>,
}

impl Message {
    /// Text of the message's leading /command, without arguments and
    /// without a @botname suffix.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        if !text.starts_with('/') {
            return None;
        }
        let first = text.split_whitespace().next()?;
        Some(first.split('@').next().unwrap_or(first))
    }

    /// Everything after the /command, trimmed. None when there is none.
    pub fn command_payload(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        let (_, rest) = text.split_once(char::is_whitespace)?;
        let rest = rest.trim();
        (!rest.is_empty()).then_some(rest)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl User {
    /// "First Last", or just "First". Empty for deleted accounts, which
    /// the Bot API reports with an empty first name.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() && !self.first_name.is_empty() => {
                format!("{} {}", self.first_name, last)
            }
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Chat {
    /// Title for group-like chats, full name for private ones.
    pub fn display_name(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !last.is_empty() => format!("{} {}", first, last),
            (Some(first), _) => first.clone(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageOrigin {
    User { sender_user: User },
    HiddenUser { sender_user_name: String },
    Chat { sender_chat: Chat },
    Channel { chat: Chat },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalReply {
    pub origin: MessageOrigin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    #[serde(default)]
    pub id: i64,
    pub chat: Chat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersShared {
    pub request_id: i64,
    #[serde(default)]
    pub users: Vec<SharedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharedUser {
    pub user_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl SharedUser {
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !last.is_empty() => format!("{} {}", first, last),
            (Some(first), _) => first.clone(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatShared {
    pub request_id: i64,
    #[serde(default)]
    pub chats: Vec<SharedChat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharedChat {
    pub chat_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Mention,
    TextMention,
    BotCommand,
    Url,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Box<Message>>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: ChatMemberStatus,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub from: User,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessConnection {
    pub id: String,
    pub user: User,
    #[serde(default)]
    pub user_chat_id: i64,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub can_reply: bool,
}

// --- outbound keyboards ---

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl InlineKeyboardButton {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
        }
    }

    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ChatAdministratorRights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_manage_chat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_promote_members: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_invite_users: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButtonRequestUsers {
    pub request_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_is_bot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_name: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButtonRequestChat {
    pub request_id: i64,
    pub chat_is_channel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_title: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_username: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_administrator_rights: Option<ChatAdministratorRights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_administrator_rights: Option<ChatAdministratorRights>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_users: Option<KeyboardButtonRequestUsers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_chat: Option<KeyboardButtonRequestChat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_field_placeholder: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

impl ReplyMarkup {
    pub fn inline(rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        ReplyMarkup::Inline(InlineKeyboardMarkup {
            inline_keyboard: rows,
        })
    }

    pub fn remove() -> Self {
        ReplyMarkup::Remove(ReplyKeyboardRemove {
            remove_keyboard: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_forward_origin_variants() {
        let user: MessageOrigin = serde_json::from_str(
            r#"{"type":"user","date":0,"sender_user":{"id":1,"first_name":"Ann"}}"#,
        )
        .expect("user origin");
        assert!(matches!(user, MessageOrigin::User { .. }));

        let hidden: MessageOrigin = serde_json::from_str(
            r#"{"type":"hidden_user","date":0,"sender_user_name":"Anonymous123"}"#,
        )
        .expect("hidden origin");
        match hidden {
            MessageOrigin::HiddenUser { sender_user_name } => {
                assert_eq!(sender_user_name, "Anonymous123")
            }
            other => panic!("unexpected origin: {:?}", other),
        }

        let channel: MessageOrigin = serde_json::from_str(
            r#"{"type":"channel","date":0,"chat":{"id":-100777,"type":"channel","title":"News"},"message_id":5}"#,
        )
        .expect("channel origin");
        assert!(matches!(channel, MessageOrigin::Channel { .. }));
    }

    #[test]
    fn unknown_chat_type_does_not_fail_deserialization() {
        let chat: Chat =
            serde_json::from_str(r#"{"id":5,"type":"something_new"}"#).expect("chat");
        assert_eq!(chat.chat_type, ChatType::Unknown);
    }

    #[test]
    fn command_strips_bot_suffix_and_args() {
        let msg: Message = serde_json::from_str(
            r#"{"message_id":1,"chat":{"id":1,"type":"private"},"text":"/link@chatid_bot -100123 extra"}"#,
        )
        .expect("message");
        assert_eq!(msg.command(), Some("/link"));
        assert_eq!(msg.command_payload(), Some("-100123 extra"));
    }

    #[test]
    fn full_name_of_deleted_account_is_empty() {
        let user: User = serde_json::from_str(r#"{"id":9,"first_name":""}"#).expect("user");
        assert_eq!(user.full_name(), "");
    }

    #[test]
    fn inline_button_serializes_only_set_fields() {
        let button = InlineKeyboardButton::url("Open", "https://t.me/chatid_bot");
        let json = serde_json::to_value(&button).expect("serialize");
        assert!(json.get("url").is_some());
        assert!(json.get("callback_data").is_none());
    }
}
