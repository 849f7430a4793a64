//! Transport seam
//!
//! The orchestrator talks to Telegram through this trait so tests can run
//! against an in-process double

use anyhow::Result;
use async_trait::async_trait;
use chatid_telegram::types::{Chat, ReplyMarkup};
use chatid_telegram::{LookupError, TelegramClient};

#[async_trait]
pub trait Transport: Send + Sync {
    fn bot_username(&self) -> &str;

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()>;

    async fn edit_message_text(
        &self,
        business_connection_id: Option<&str>,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()>;

    async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>)
        -> Result<()>;

    async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        title: &str,
        message_text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()>;

    async fn leave_chat(&self, chat_id: i64) -> Result<()>;

    async fn lookup_username(&self, username: &str) -> Result<Chat, LookupError>;
}

#[async_trait]
impl Transport for TelegramClient {
    fn bot_username(&self) -> &str {
        TelegramClient::bot_username(self)
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        TelegramClient::send_message(self, chat_id, text, reply_to, reply_markup).await
    }

    async fn edit_message_text(
        &self,
        business_connection_id: Option<&str>,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        TelegramClient::edit_message_text(
            self,
            business_connection_id,
            chat_id,
            message_id,
            text,
            reply_markup,
        )
        .await
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<()> {
        TelegramClient::answer_callback_query(self, callback_query_id, text).await
    }

    async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        title: &str,
        message_text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        TelegramClient::answer_inline_query(self, inline_query_id, title, message_text, reply_markup)
            .await
    }

    async fn leave_chat(&self, chat_id: i64) -> Result<()> {
        TelegramClient::leave_chat(self, chat_id).await
    }

    async fn lookup_username(&self, username: &str) -> Result<Chat, LookupError> {
        TelegramClient::get_chat(self, username).await
    }
}
