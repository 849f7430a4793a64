//! Priority dispatcher
//!
//! Decides which single origin shape applies to an inbound message. Most
//! shapes are discriminated by the event type itself; the reply family is
//! ordered: story, then same-chat reply, then external reply, then the
//! conversation the message arrived in

use chatid_telegram::types::{
    ChatShared, Contact, Message, MessageOrigin, Story, User, UsersShared,
};

use crate::identity::Resolution;
use crate::resolve;

/// Request-button protocol shared between the keyboards this bot sends
/// and the share events it receives back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    User,
    Bot,
    Group,
    Channel,
    /// The share event doubles as "the bot was just added to this group".
    AddToGroup,
}

impl RequestKind {
    pub fn id(self) -> i64 {
        match self {
            RequestKind::User => 1,
            RequestKind::Bot => 2,
            RequestKind::Group => 3,
            RequestKind::Channel => 4,
            RequestKind::AddToGroup => 100,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(RequestKind::User),
            2 => Some(RequestKind::Bot),
            3 => Some(RequestKind::Group),
            4 => Some(RequestKind::Channel),
            100 => Some(RequestKind::AddToGroup),
            _ => None,
        }
    }
}

/// The origin shape of a message.
#[derive(Debug)]
pub enum Origin<'a> {
    SharedUsers(&'a UsersShared),
    SharedChats(&'a ChatShared),
    Contact(&'a Contact),
    Forward(&'a MessageOrigin),
    StoryShare(&'a Story),
    ViaBot(&'a User),
    /// No discriminating payload; commands, username lookups and the
    /// reply family are resolved from here.
    Plain,
}

pub fn classify(msg: &Message) -> Origin<'_> {
    if let Some(shared) = &msg.users_shared {
        return Origin::SharedUsers(shared);
    }
    if let Some(shared) = &msg.chat_shared {
        return Origin::SharedChats(shared);
    }
    if let Some(contact) = &msg.contact {
        return Origin::Contact(contact);
    }
    if let Some(origin) = &msg.forward_origin {
        return Origin::Forward(origin);
    }
    if let Some(story) = &msg.story {
        return Origin::StoryShare(story);
    }
    if let Some(via_bot) = &msg.via_bot {
        return Origin::ViaBot(via_bot);
    }
    Origin::Plain
}

/// Resolve the reply family in its fixed precedence order. The final arm
/// falls back to the identity of the conversation itself.
pub fn resolve_reply(msg: &Message) -> Resolution {
    if let Some(story) = &msg.reply_to_story {
        return resolve::from_story(story);
    }
    if let Some(reply) = &msg.reply_to_message {
        return resolve::from_reply_to_message(reply);
    }
    if let Some(external) = &msg.external_reply {
        return Resolution::Identity(resolve::from_forward_origin(&external.origin));
    }
    match crate::identity::Identity::from_chat(&msg.chat) {
        Some(identity) => Resolution::Identity(identity),
        None => Resolution::NoMatch,
    }
}

/// True when the message carries any member of the reply family.
pub fn has_reply(msg: &Message) -> bool {
    msg.reply_to_story.is_some() || msg.reply_to_message.is_some() || msg.external_reply.is_some()
}
