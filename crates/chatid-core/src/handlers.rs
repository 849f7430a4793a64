//! Response orchestrator
//!
//! One entry point per inbound event category. Each handler sequences
//! dispatch, resolution, composition, the outbound send, and the
//! persistence/stats side effects. Failures never escape the update loop

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use chatid_i18n::{render, text, Language, TextKey};
use chatid_storage::{StatEvent, Storage};
use chatid_telegram::types::{
    BusinessConnection, CallbackQuery, ChatMemberStatus, ChatMemberUpdated, ChatShared, ChatType,
    Contact, InlineKeyboardButton, InlineQuery, Message, MessageOrigin, ReplyMarkup, Story, Update,
    User, UsersShared,
};
use chatid_telegram::LookupError;

use crate::compose;
use crate::dispatch::{self, Origin, RequestKind};
use crate::gateway::Transport;
use crate::identity::{Identity, Resolution};
use crate::resolve::{self, MentionRef};

pub struct EventHandler<T: Transport> {
    transport: T,
    storage: Arc<Mutex<Storage>>,
    default_lang: Language,
}

impl<T: Transport> EventHandler<T> {
    pub fn new(transport: T, storage: Arc<Mutex<Storage>>, default_lang: Language) -> Self {
        Self {
            transport,
            storage,
            default_lang,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Top-level router. Every failure is logged and dropped here so one
    /// bad update cannot stall the polling loop.
    pub async fn handle_update(&self, update: Update) {
        let update_id = update.update_id;
        let result = if let Some(msg) = update.message {
            self.handle_message(msg).await
        } else if let Some(msg) = update.business_message {
            self.handle_business_message(msg).await
        } else if let Some(query) = update.callback_query {
            self.handle_callback_query(query).await
        } else if let Some(query) = update.inline_query {
            self.handle_inline_query(query).await
        } else if let Some(updated) = update.my_chat_member {
            self.handle_chat_member_updated(updated).await
        } else if let Some(connection) = update.business_connection {
            self.handle_business_connection(connection).await
        } else {
            Ok(())
        };

        if let Err(err) = result {
            warn!(update_id, "update handling failed: {err:#}");
        }
    }

    pub async fn handle_message(&self, msg: Message) -> Result<()> {
        match msg.chat.chat_type {
            ChatType::Private => self.handle_private_message(msg).await,
            ChatType::Group | ChatType::Supergroup => self.handle_group_message(msg).await,
            _ => Ok(()),
        }
    }

    async fn handle_private_message(&self, msg: Message) -> Result<()> {
        let Some(from) = msg.from.clone() else {
            return Ok(());
        };
        let lang = self.user_language(&from);

        match dispatch::classify(&msg) {
            Origin::SharedUsers(shared) => self.on_shared_users(&msg, &from, shared, lang).await,
            Origin::SharedChats(shared) => self.on_shared_chats(&msg, &from, shared, lang).await,
            Origin::Contact(contact) => self.on_contact(&msg, &from, contact, lang).await,
            Origin::Forward(origin) => self.on_forward(&msg, &from, origin, lang).await,
            Origin::StoryShare(story) => self.on_story(&msg, &from, story, lang).await,
            Origin::ViaBot(via_bot) => self.on_via_bot(&msg, &from, via_bot, lang).await,
            Origin::Plain => self.on_plain_private(&msg, &from, lang).await,
        }
    }

    async fn on_plain_private(&self, msg: &Message, from: &User, lang: Language) -> Result<()> {
        match msg.command() {
            Some("/start") => match msg.command_payload() {
                Some(payload) if payload.starts_with("link_") => {
                    self.send_chat_link(msg, from, &payload["link_".len()..], lang)
                        .await
                }
                Some(payload) if payload.starts_with("bizChat") => {
                    self.on_manage_business(msg, from, payload, lang).await
                }
                _ => self.send_welcome(msg, from, lang).await,
            },
            Some("/me") => self.on_me(msg, from, lang).await,
            Some("/lang") | Some("/language") => {
                self.transport
                    .send_message(
                        msg.chat.id,
                        text(TextKey::ChoiceLang, lang),
                        Some(msg.message_id),
                        Some(&compose::language_keyboard()),
                    )
                    .await
            }
            Some("/add") => {
                self.transport
                    .send_message(
                        msg.chat.id,
                        text(TextKey::AddBotToGroup, lang),
                        Some(msg.message_id),
                        Some(&compose::add_to_group_keyboard(lang)),
                    )
                    .await
            }
            Some("/manage") => {
                self.transport
                    .send_message(
                        msg.chat.id,
                        text(TextKey::ChatManager, lang),
                        Some(msg.message_id),
                        Some(&compose::manager_keyboard(lang)),
                    )
                    .await
            }
            Some("/link") => match msg.command_payload() {
                Some(payload) => self.send_chat_link(msg, from, payload, lang).await,
                None => {
                    self.transport
                        .send_message(
                            msg.chat.id,
                            text(TextKey::FormatLink, lang),
                            Some(msg.message_id),
                            None,
                        )
                        .await
                }
            },
            Some("/about") => {
                let markup = ReplyMarkup::inline(vec![vec![InlineKeyboardButton::url(
                    text(TextKey::ButtonDev, lang),
                    text(TextKey::LinkDev, lang),
                )]]);
                self.transport
                    .send_message(
                        msg.chat.id,
                        text(TextKey::InfoAbout, lang),
                        Some(msg.message_id),
                        Some(&markup),
                    )
                    .await
            }
            Some("/privacy") => {
                self.transport
                    .send_message(
                        msg.chat.id,
                        "https://telegra.ph/Privacy-Policy-for-Chat-ID-Bot",
                        Some(msg.message_id),
                        None,
                    )
                    .await
            }
            _ => {
                let has_username = msg
                    .text
                    .as_deref()
                    .and_then(resolve::extract_username)
                    .is_some();
                if has_username {
                    self.on_username_text(msg, from, lang).await
                } else if dispatch::has_reply(msg) {
                    self.on_private_reply(msg, from, lang).await
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn send_welcome(&self, msg: &Message, from: &User, lang: Language) -> Result<()> {
        {
            let storage = self.storage()?;
            storage.create_user(
                from.id,
                &from.full_name(),
                from.username.as_deref(),
                from.language_code.as_deref(),
            )?;
        }
        let welcome = render(text(TextKey::Welcome, lang), &[&from.full_name()]);
        self.transport
            .send_message(
                msg.chat.id,
                &welcome,
                Some(msg.message_id),
                Some(&compose::welcome_keyboard(lang)),
            )
            .await
    }

    async fn on_me(&self, msg: &Message, from: &User, lang: Language) -> Result<()> {
        let identity = resolve::person_or_bot(from);
        self.reply_resolution(msg, Resolution::Identity(identity), lang)
            .await?;
        self.record_stat(StatEvent::Me, from.language_code.as_deref());
        Ok(())
    }

    async fn on_forward(
        &self,
        msg: &Message,
        from: &User,
        origin: &MessageOrigin,
        lang: Language,
    ) -> Result<()> {
        let identity = resolve::from_forward_origin(origin);
        self.reply_resolution(msg, Resolution::Identity(identity), lang)
            .await?;
        self.record_stat(StatEvent::ForwardMessage, from.language_code.as_deref());
        Ok(())
    }

    async fn on_contact(
        &self,
        msg: &Message,
        from: &User,
        contact: &Contact,
        lang: Language,
    ) -> Result<()> {
        let resolution = resolve::from_contact(contact, lang);
        self.reply_resolution(msg, resolution, lang).await?;
        self.record_stat(StatEvent::Contact, from.language_code.as_deref());
        Ok(())
    }

    async fn on_story(
        &self,
        msg: &Message,
        from: &User,
        story: &Story,
        lang: Language,
    ) -> Result<()> {
        let resolution = resolve::from_story(story);
        self.reply_resolution(msg, resolution, lang).await?;
        self.record_stat(StatEvent::Story, from.language_code.as_deref());
        Ok(())
    }

    async fn on_via_bot(
        &self,
        msg: &Message,
        from: &User,
        via_bot: &User,
        lang: Language,
    ) -> Result<()> {
        let identity = resolve::person_or_bot(via_bot);
        self.reply_resolution(msg, Resolution::Identity(identity), lang)
            .await?;
        self.record_stat(StatEvent::ViaBot, from.language_code.as_deref());
        Ok(())
    }

    async fn on_shared_users(
        &self,
        msg: &Message,
        from: &User,
        shared: &UsersShared,
        lang: Language,
    ) -> Result<()> {
        let resolution = resolve::from_users_shared(shared, lang);
        self.reply_resolution(msg, resolution, lang).await?;
        self.record_stat(StatEvent::ButtonShareChat, from.language_code.as_deref());
        Ok(())
    }

    async fn on_shared_chats(
        &self,
        msg: &Message,
        from: &User,
        shared: &ChatShared,
        lang: Language,
    ) -> Result<()> {
        if RequestKind::from_id(shared.request_id) == Some(RequestKind::AddToGroup) {
            return self.on_added_to_group(msg, from, shared, lang).await;
        }
        let resolution = resolve::from_chats_shared(shared, lang);
        self.reply_resolution(msg, resolution, lang).await?;
        self.record_stat(StatEvent::ButtonShareChat, from.language_code.as_deref());
        Ok(())
    }

    /// The reserved request id means the bot was just added to the shared
    /// group: persist the group before answering.
    async fn on_added_to_group(
        &self,
        msg: &Message,
        from: &User,
        shared: &ChatShared,
        lang: Language,
    ) -> Result<()> {
        let Some(chat) = shared.chats.first() else {
            return Ok(());
        };
        let title = chat.title.clone().unwrap_or_default();

        {
            let storage = self.storage()?;
            if storage.group_exists(chat.chat_id)? {
                storage.reactivate_group(chat.chat_id, from.id)?;
            } else {
                storage.create_group(chat.chat_id, &title, chat.username.as_deref(), from.id)?;
            }
        }

        let group_link = format!("[{}]({})", title, compose::supergroup_link(chat.chat_id));
        let answer = render(
            text(TextKey::BotAddedToGroup, lang),
            &[&group_link, &chat.chat_id.to_string()],
        );
        self.transport
            .send_message(
                msg.chat.id,
                &answer,
                Some(msg.message_id),
                Some(&ReplyMarkup::remove()),
            )
            .await?;
        self.record_stat(StatEvent::ButtonShareChat, from.language_code.as_deref());
        Ok(())
    }

    async fn on_username_text(&self, msg: &Message, from: &User, lang: Language) -> Result<()> {
        let raw = msg.text.as_deref().unwrap_or_default();
        let (answer, chat_id) = self.username_outcome(lang, raw).await?;
        let markup = compose::deep_link_markup(self.transport.bot_username(), chat_id, lang);
        self.transport
            .send_message(msg.chat.id, &answer, Some(msg.message_id), markup.as_ref())
            .await?;
        self.record_stat(StatEvent::SearchUsername, from.language_code.as_deref());
        Ok(())
    }

    async fn on_private_reply(&self, msg: &Message, from: &User, lang: Language) -> Result<()> {
        let resolution = dispatch::resolve_reply(msg);
        self.reply_resolution(msg, resolution, lang).await?;
        let event = if msg.reply_to_story.is_some() {
            StatEvent::Story
        } else {
            StatEvent::ReplyToAnotherChat
        };
        self.record_stat(event, from.language_code.as_deref());
        Ok(())
    }

    async fn send_chat_link(
        &self,
        msg: &Message,
        from: &User,
        target: &str,
        lang: Language,
    ) -> Result<()> {
        let target = target.trim().replace(' ', "");
        if target.is_empty() || target.parse::<i64>().is_err() {
            return self
                .transport
                .send_message(
                    msg.chat.id,
                    text(TextKey::FormatLink, lang),
                    Some(msg.message_id),
                    None,
                )
                .await;
        }

        let answer = render(text(TextKey::LinkToChat, lang), &[&target]);
        self.transport
            .send_message(
                msg.chat.id,
                &answer,
                Some(msg.message_id),
                Some(&compose::chat_link_markup(&target)),
            )
            .await?;
        self.record_stat(StatEvent::Link, from.language_code.as_deref());
        Ok(())
    }

    async fn on_manage_business(
        &self,
        msg: &Message,
        from: &User,
        payload: &str,
        lang: Language,
    ) -> Result<()> {
        let raw = payload.trim_start_matches("bizChat");
        let Ok(chat_id) = raw.parse::<i64>() else {
            return Ok(());
        };
        let answer = render(
            text(TextKey::IdByManageBusiness, lang),
            &[&chat_id.to_string()],
        );
        self.transport
            .send_message(msg.chat.id, &answer, Some(msg.message_id), None)
            .await?;
        self.record_stat(StatEvent::BusinessSettings, from.language_code.as_deref());
        Ok(())
    }

    async fn handle_group_message(&self, msg: Message) -> Result<()> {
        let triggered = msg.command() == Some("/id") || resolve::has_mentions(&msg);
        if !triggered {
            return Ok(());
        }

        let identity = match resolve::first_mention(&msg) {
            Some(MentionRef::Handle(handle)) => {
                match self
                    .transport
                    .lookup_username(handle.trim_start_matches('@'))
                    .await
                {
                    Ok(chat) => Identity::from_chat(&chat),
                    Err(LookupError::NotFound) => None,
                    Err(LookupError::Api(err)) => return Err(err),
                }
            }
            Some(MentionRef::Direct(user)) => Some(resolve::person_or_bot_deleted_aware(user)),
            None => match dispatch::resolve_reply(&msg) {
                Resolution::Identity(identity) => Some(identity),
                _ => None,
            },
        };

        let Some(line) = identity.as_ref().and_then(compose::terse_line) else {
            return Ok(());
        };

        if let Err(err) = self
            .transport
            .send_message(msg.chat.id, &line, Some(msg.message_id), None)
            .await
        {
            // no way to answer here; assume the bot is unwelcome
            warn!(chat_id = msg.chat.id, "group send failed, leaving: {err:#}");
            self.transport.leave_chat(msg.chat.id).await?;
            return Ok(());
        }

        self.record_stat(
            StatEvent::IdInGroup,
            msg.from.as_ref().and_then(|u| u.language_code.as_deref()),
        );
        Ok(())
    }

    pub async fn handle_callback_query(&self, query: CallbackQuery) -> Result<()> {
        let Some(data) = query.data.as_deref() else {
            return Ok(());
        };

        if let Some(code) = data.strip_prefix("lang:") {
            let Ok(lang) = code.parse::<Language>() else {
                return Ok(());
            };
            {
                let storage = self.storage()?;
                storage.update_user_language(query.from.id, code)?;
            }
            self.transport.answer_callback_query(&query.id, None).await?;
            if let Some(message) = &query.message {
                let done = render(text(TextKey::LangDone, lang), &[code]);
                self.transport
                    .edit_message_text(None, message.chat.id, message.message_id, &done, None)
                    .await?;
            }
        }

        Ok(())
    }

    pub async fn handle_inline_query(&self, query: InlineQuery) -> Result<()> {
        let lang = self.user_language(&query.from);
        let (answer, _) = self.username_outcome(lang, &query.query).await?;
        let markup = compose::powered_by_markup(self.transport.bot_username());

        if let Err(err) = self
            .transport
            .answer_inline_query(&query.id, "Get Chat ID", &answer, Some(&markup))
            .await
        {
            warn!("answering inline query failed: {err:#}");
        }

        self.record_stat(StatEvent::SearchInline, query.from.language_code.as_deref());
        Ok(())
    }

    /// Messages the connected account owner sends in their business chats:
    /// resolve through the reply chain and edit the triggering message in
    /// place with the answer.
    pub async fn handle_business_message(&self, msg: Message) -> Result<()> {
        let Some(from) = msg.from.clone() else {
            return Ok(());
        };
        let lang = self.user_language(&from);

        let answer = match dispatch::resolve_reply(&msg) {
            Resolution::Identity(identity) => compose::identity_text(&identity, lang),
            Resolution::Text(text) => text,
            Resolution::NoMatch => return Ok(()),
        };

        let markup = compose::powered_by_markup(self.transport.bot_username());
        self.transport
            .edit_message_text(
                msg.business_connection_id.as_deref(),
                msg.chat.id,
                msg.message_id,
                &answer,
                Some(&markup),
            )
            .await?;
        self.record_stat(StatEvent::BusinessId, from.language_code.as_deref());
        Ok(())
    }

    pub async fn handle_business_connection(&self, connection: BusinessConnection) -> Result<()> {
        let user = &connection.user;
        {
            let storage = self.storage()?;
            if !storage.user_exists(user.id)? {
                storage.create_user(
                    user.id,
                    &user.full_name(),
                    user.username.as_deref(),
                    user.language_code.as_deref(),
                )?;
            } else if !storage.is_user_active(user.id)? {
                storage.set_user_active(user.id, true)?;
            }
        }

        let lang = self.user_language(user);
        let chat_id = if connection.user_chat_id != 0 {
            connection.user_chat_id
        } else {
            user.id
        };

        if connection.is_enabled {
            if connection.can_reply {
                {
                    let storage = self.storage()?;
                    storage.set_user_business_connection(user.id, Some(&connection.id))?;
                }
                self.transport
                    .send_message(chat_id, text(TextKey::BusinessConnection, lang), None, None)
                    .await?;
            } else {
                self.transport
                    .send_message(
                        chat_id,
                        text(TextKey::BusinessConnectionDisabled, lang),
                        None,
                        None,
                    )
                    .await?;
            }
        } else {
            {
                let storage = self.storage()?;
                storage.set_user_business_connection(user.id, None)?;
            }
            self.transport
                .send_message(
                    chat_id,
                    text(TextKey::BusinessConnectionRemoved, lang),
                    None,
                    None,
                )
                .await?;
        }

        Ok(())
    }

    /// Membership bookkeeping: a user blocking the bot or the bot losing
    /// its admin seat deactivates the corresponding record.
    pub async fn handle_chat_member_updated(&self, updated: ChatMemberUpdated) -> Result<()> {
        let old_status = updated.old_chat_member.status;
        let new_status = updated.new_chat_member.status;

        match updated.chat.chat_type {
            ChatType::Private => {
                if old_status == ChatMemberStatus::Member && new_status == ChatMemberStatus::Kicked
                {
                    let storage = self.storage()?;
                    if storage.user_exists(updated.from.id)? {
                        debug!(user_id = updated.from.id, "bot stopped by user");
                        storage.set_user_active(updated.from.id, false)?;
                    }
                }
            }
            ChatType::Group | ChatType::Supergroup | ChatType::Channel => {
                if old_status == ChatMemberStatus::Administrator
                    && matches!(
                        new_status,
                        ChatMemberStatus::Member | ChatMemberStatus::Restricted
                    )
                {
                    debug!(chat_id = updated.chat.id, "bot demoted, deactivating group");
                    let storage = self.storage()?;
                    storage.set_group_active(updated.chat.id, false)?;
                }
            }
            ChatType::Unknown => {}
        }

        Ok(())
    }

    /// Send a resolution as a quoted reply, with the deep-link button when
    /// a single concrete id is available.
    async fn reply_resolution(
        &self,
        msg: &Message,
        resolution: Resolution,
        lang: Language,
    ) -> Result<()> {
        match resolution {
            Resolution::Identity(Identity::Hidden { name }) if name.is_empty() => Ok(()),
            Resolution::Identity(identity) => {
                let answer = compose::identity_text(&identity, lang);
                let markup =
                    compose::deep_link_markup(self.transport.bot_username(), identity.id(), lang);
                self.transport
                    .send_message(msg.chat.id, &answer, Some(msg.message_id), markup.as_ref())
                    .await
            }
            Resolution::Text(answer) => {
                self.transport
                    .send_message(msg.chat.id, &answer, Some(msg.message_id), None)
                    .await
            }
            Resolution::NoMatch => Ok(()),
        }
    }

    /// Shared by the message and inline username flows: the composed
    /// answer plus the id for the deep-link button. Lookup misses and
    /// unusable result types both degrade to the fixed text.
    async fn username_outcome(
        &self,
        lang: Language,
        raw: &str,
    ) -> Result<(String, Option<i64>)> {
        let Some(username) = resolve::extract_username(raw) else {
            return Ok((text(TextKey::CanNotGetTheId, lang).to_string(), None));
        };

        match self.transport.lookup_username(&username).await {
            Ok(chat) => match Identity::from_chat(&chat) {
                Some(identity) => {
                    let id = identity.id();
                    Ok((compose::identity_text(&identity, lang), id))
                }
                None => Ok((text(TextKey::CanNotGetTheId, lang).to_string(), None)),
            },
            Err(LookupError::NotFound) => {
                Ok((text(TextKey::CanNotGetTheId, lang).to_string(), None))
            }
            Err(LookupError::Api(err)) => Err(err),
        }
    }

    fn user_language(&self, user: &User) -> Language {
        let stored = match self.storage.lock() {
            Ok(storage) => storage.get_user_language(user.id).unwrap_or_default(),
            Err(_) => None,
        };
        if let Some(lang) = stored.as_deref().and_then(|code| code.parse().ok()) {
            return lang;
        }
        user.language_code
            .as_deref()
            .and_then(Language::from_language_code)
            .unwrap_or(self.default_lang)
    }

    fn storage(&self) -> Result<MutexGuard<'_, Storage>> {
        self.storage
            .lock()
            .map_err(|_| anyhow!("storage lock poisoned"))
    }

    /// Stats must never fail the response path.
    fn record_stat(&self, event: StatEvent, lang: Option<&str>) {
        match self.storage.lock() {
            Ok(storage) => {
                if let Err(err) = storage.record_stat(event, lang) {
                    warn!("failed to record stat {}: {err:#}", event.as_str());
                }
            }
            Err(_) => warn!("storage lock poisoned, stat {} dropped", event.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chatid_telegram::types::Chat;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<(i64, String, bool)>>,
        edited: Mutex<Vec<(i64, String)>>,
        left: Mutex<Vec<i64>>,
        inline_answers: Mutex<Vec<String>>,
        fail_sends: AtomicBool,
        known_usernames: HashMap<String, Chat>,
    }

    impl MockTransport {
        fn sent_texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .expect("sent")
                .iter()
                .map(|(_, text, _)| text.clone())
                .collect()
        }

        fn last_sent(&self) -> (i64, String, bool) {
            self.sent
                .lock()
                .expect("sent")
                .last()
                .cloned()
                .expect("nothing sent")
        }
    }

    #[async_trait::async_trait]
    impl Transport for MockTransport {
        fn bot_username(&self) -> &str {
            "chatid_bot"
        }

        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            _reply_to: Option<i64>,
            reply_markup: Option<&ReplyMarkup>,
        ) -> Result<()> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err(anyhow!("blocked"));
            }
            self.sent
                .lock()
                .expect("sent")
                .push((chat_id, text.to_string(), reply_markup.is_some()));
            Ok(())
        }

        async fn edit_message_text(
            &self,
            _business_connection_id: Option<&str>,
            chat_id: i64,
            _message_id: i64,
            text: &str,
            _reply_markup: Option<&ReplyMarkup>,
        ) -> Result<()> {
            self.edited
                .lock()
                .expect("edited")
                .push((chat_id, text.to_string()));
            Ok(())
        }

        async fn answer_callback_query(
            &self,
            _callback_query_id: &str,
            _text: Option<&str>,
        ) -> Result<()> {
            Ok(())
        }

        async fn answer_inline_query(
            &self,
            _inline_query_id: &str,
            _title: &str,
            message_text: &str,
            _reply_markup: Option<&ReplyMarkup>,
        ) -> Result<()> {
            self.inline_answers
                .lock()
                .expect("inline")
                .push(message_text.to_string());
            Ok(())
        }

        async fn leave_chat(&self, chat_id: i64) -> Result<()> {
            self.left.lock().expect("left").push(chat_id);
            Ok(())
        }

        async fn lookup_username(&self, username: &str) -> Result<Chat, LookupError> {
            self.known_usernames
                .get(username)
                .cloned()
                .ok_or(LookupError::NotFound)
        }
    }

    fn handler(transport: MockTransport) -> EventHandler<MockTransport> {
        let storage = Arc::new(Mutex::new(
            Storage::open_in_memory().expect("storage init"),
        ));
        EventHandler::new(transport, storage, Language::English)
    }

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).expect("message")
    }

    fn private_from() -> serde_json::Value {
        serde_json::json!({"id": 42, "first_name": "Requester", "language_code": "en"})
    }

    #[tokio::test]
    async fn forwarded_hidden_sender_composes_without_id_or_button() {
        let handler = handler(MockTransport::default());
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "forward_origin": {"type": "hidden_user", "sender_user_name": "Anonymous123"},
        }));

        handler.handle_message(msg).await.expect("handled");

        let (_, text, has_markup) = handler.transport.last_sent();
        assert!(text.contains("Anonymous123"));
        assert!(!text.contains('`'));
        assert!(!has_markup);
    }

    #[tokio::test]
    async fn single_shared_user_gets_identity_and_deep_link() {
        let handler = handler(MockTransport::default());
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "users_shared": {"request_id": 1, "users": [{"user_id": 777, "first_name": "Ann"}]},
        }));

        handler.handle_message(msg).await.expect("handled");

        let (_, text, has_markup) = handler.transport.last_sent();
        assert!(text.contains("`777`"));
        assert!(has_markup, "single share should carry the deep-link button");
    }

    #[tokio::test]
    async fn multiple_shared_users_get_aggregated_text_without_button() {
        let handler = handler(MockTransport::default());
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "users_shared": {"request_id": 1, "users": [
                {"user_id": 777, "first_name": "Ann"},
                {"user_id": 778, "first_name": "Ben"},
            ]},
        }));

        handler.handle_message(msg).await.expect("handled");

        let (_, text, has_markup) = handler.transport.last_sent();
        assert!(text.contains("`777`"));
        assert!(text.contains("`778`"));
        assert!(!has_markup, "batches never carry a deep-link button");
    }

    #[tokio::test]
    async fn added_to_group_persists_group_and_strips_link_prefix() {
        let handler = handler(MockTransport::default());
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "chat_shared": {"request_id": 100, "chats": [
                {"chat_id": -1001234567_i64, "title": "The Club"},
            ]},
        }));

        handler.handle_message(msg).await.expect("handled");

        {
            let storage = handler.storage.lock().expect("storage");
            assert!(storage.group_exists(-1001234567).expect("exists"));
            assert!(storage.is_group_active(-1001234567).expect("active"));
        }
        let (_, text, _) = handler.transport.last_sent();
        assert!(text.contains("t.me/c/1234567"));
        assert!(text.contains("`-1001234567`"));
    }

    #[tokio::test]
    async fn unknown_username_degrades_to_fixed_text_without_button() {
        let handler = handler(MockTransport::default());
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "text": "@nosuchname",
        }));

        handler.handle_message(msg).await.expect("handled");

        let (_, text, has_markup) = handler.transport.last_sent();
        assert_eq!(
            text,
            chatid_i18n::text(TextKey::CanNotGetTheId, Language::English)
        );
        assert!(!has_markup);

        let storage = handler.storage.lock().expect("storage");
        assert_eq!(
            storage.count_stats(StatEvent::SearchUsername).expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn resolved_username_answers_with_identity() {
        let mut transport = MockTransport::default();
        transport.known_usernames.insert(
            "durov".to_string(),
            serde_json::from_value(serde_json::json!({
                "id": 999,
                "type": "private",
                "first_name": "Pavel",
            }))
            .expect("chat"),
        );
        let handler = handler(transport);
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "text": "https://t.me/durov",
        }));

        handler.handle_message(msg).await.expect("handled");

        let (_, text, has_markup) = handler.transport.last_sent();
        assert!(text.contains("`999`"));
        assert!(has_markup);
    }

    #[tokio::test]
    async fn group_send_failure_makes_the_bot_leave() {
        let transport = MockTransport::default();
        transport.fail_sends.store(true, Ordering::SeqCst);
        let handler = handler(transport);
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": -100444, "type": "supergroup", "title": "The Club"},
            "from": private_from(),
            "text": "/id",
        }));

        handler.handle_message(msg).await.expect("handled");

        let left = handler.transport.left.lock().expect("left");
        assert_eq!(left.as_slice(), &[-100444]);
    }

    #[tokio::test]
    async fn group_default_fallback_answers_with_conversation_identity() {
        let handler = handler(MockTransport::default());
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": -100444, "type": "supergroup", "title": "The Club"},
            "from": private_from(),
            "text": "/id",
        }));

        handler.handle_message(msg).await.expect("handled");

        let (chat_id, text, _) = handler.transport.last_sent();
        assert_eq!(chat_id, -100444);
        assert_eq!(text, "The Club • `-100444`");
    }

    #[tokio::test]
    async fn language_callback_persists_choice_and_edits_message() {
        let handler = handler(MockTransport::default());
        let query: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "cb1",
            "from": private_from(),
            "data": "lang:he",
            "message": {
                "message_id": 9,
                "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            },
        }))
        .expect("query");

        handler.handle_callback_query(query).await.expect("handled");

        {
            let storage = handler.storage.lock().expect("storage");
            assert_eq!(
                storage.get_user_language(42).expect("lang"),
                Some("he".to_string())
            );
        }
        let edited = handler.transport.edited.lock().expect("edited");
        assert_eq!(edited.len(), 1);
    }

    #[tokio::test]
    async fn business_connection_registers_the_user() {
        let handler = handler(MockTransport::default());
        let connection: BusinessConnection = serde_json::from_value(serde_json::json!({
            "id": "conn-1",
            "user": {"id": 42, "first_name": "Owner", "username": "owner", "language_code": "en"},
            "user_chat_id": 42,
            "is_enabled": true,
            "can_reply": true,
        }))
        .expect("connection");

        handler
            .handle_business_connection(connection)
            .await
            .expect("handled");

        {
            let storage = handler.storage.lock().expect("storage");
            assert!(storage.user_exists(42).expect("exists"));
        }
        let sent = handler.transport.sent_texts();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            chatid_i18n::text(TextKey::BusinessConnection, Language::English)
        );
    }

    #[tokio::test]
    async fn blocking_the_bot_deactivates_the_user() {
        let handler = handler(MockTransport::default());
        {
            let storage = handler.storage.lock().expect("storage");
            storage
                .create_user(42, "Requester", None, Some("en"))
                .expect("create");
        }
        let updated: ChatMemberUpdated = serde_json::from_value(serde_json::json!({
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "old_chat_member": {"status": "member", "user": {"id": 1000, "first_name": "Bot", "is_bot": true}},
            "new_chat_member": {"status": "kicked", "user": {"id": 1000, "first_name": "Bot", "is_bot": true}},
        }))
        .expect("updated");

        handler
            .handle_chat_member_updated(updated)
            .await
            .expect("handled");

        let storage = handler.storage.lock().expect("storage");
        assert!(!storage.is_user_active(42).expect("active"));
    }

    #[tokio::test]
    async fn plain_private_chatter_is_ignored() {
        let handler = handler(MockTransport::default());
        let msg = message(serde_json::json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private", "first_name": "Requester"},
            "from": private_from(),
            "text": "hello there",
        }));

        handler.handle_message(msg).await.expect("handled");
        assert!(handler.transport.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn inline_query_is_answered_with_lookup_outcome() {
        let handler = handler(MockTransport::default());
        let query: InlineQuery = serde_json::from_value(serde_json::json!({
            "id": "iq1",
            "from": private_from(),
            "query": "@whoever",
        }))
        .expect("query");

        handler.handle_inline_query(query).await.expect("handled");

        let answers = handler.transport.inline_answers.lock().expect("answers");
        assert_eq!(answers.len(), 1);
        assert_eq!(
            answers[0],
            chatid_i18n::text(TextKey::CanNotGetTheId, Language::English)
        );
    }
}
