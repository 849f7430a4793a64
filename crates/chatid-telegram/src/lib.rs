//! Chatid Telegram Client
//!
//! Telegram Bot API long-polling with offset persistence, client recreation,
//! keyboards, chat lookups, and message chunking

pub mod types;

use anyhow::{anyhow, Result};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use types::{Chat, ReplyMarkup, Update};

const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const ALLOWED_UPDATES: &[&str] = &[
    "message",
    "business_message",
    "callback_query",
    "inline_query",
    "my_chat_member",
    "business_connection",
];

/// Failure modes of a username lookup. Everything the Bot API reports as a
/// bad request (unknown username, malformed handle) collapses to `NotFound`;
/// transport-level faults stay separate.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("username not found")]
    NotFound,
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    client: Client,
    bot_token: String,
    bot_username: String,
    api_url: String,
    data_dir: PathBuf,
    poll_timeout_secs: u64,
    client_recreate_interval_secs: u64,
}

impl TelegramClient {
    pub fn new(
        bot_token: &str,
        bot_username: &str,
        data_dir: PathBuf,
        poll_timeout_secs: u64,
        client_recreate_interval_secs: u64,
    ) -> Self {
        let api_url = format!("https://api.telegram.org/bot{}", bot_token);
        Self {
            client: Self::build_client(),
            bot_token: bot_token.to_string(),
            bot_username: bot_username.trim_start_matches('@').to_string(),
            api_url,
            data_dir,
            poll_timeout_secs,
            client_recreate_interval_secs,
        }
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    fn build_client() -> Client {
        ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(600))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .timeout(Duration::from_secs(180))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client")
    }

    fn offset_path(&self) -> PathBuf {
        let runtime_dir = self.data_dir.join("runtime");
        let _ = std::fs::create_dir_all(&runtime_dir);
        let bot_id = self.bot_token.split(':').next().unwrap_or("default");
        runtime_dir.join(format!("telegram.{}.offset", bot_id))
    }

    async fn read_offset(&self) -> Option<i64> {
        let p = self.offset_path();
        match fs::read_to_string(&p).await {
            Ok(content) => content.trim().parse().ok(),
            Err(_) => None,
        }
    }

    async fn write_offset(&self, offset: i64) {
        let p = self.offset_path();
        if let Some(parent) = p.parent() {
            let _ = fs::create_dir_all(parent).await;
        }
        let _ = fs::write(&p, format!("{}\n", offset)).await;
    }

    pub async fn get_updates(&self, client: &Client, offset: Option<i64>) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.api_url);

        let mut payload = serde_json::json!({
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ALLOWED_UPDATES,
        });

        if let Some(offset) = offset {
            payload["offset"] = serde_json::json!(offset);
        }

        let resp = client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram getUpdates request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("telegram getUpdates HTTP error: {}", e))?;

        let parsed: ApiResponse<Vec<Update>> = resp
            .json()
            .await
            .map_err(|e| anyhow!("telegram getUpdates decode failed: {}", e))?;

        if !parsed.ok {
            return Err(anyhow!("telegram getUpdates returned ok=false"));
        }

        Ok(parsed.result.unwrap_or_default())
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let chunks = chunk_message(text);

        for (i, chunk) in chunks.iter().enumerate() {
            let url = format!("{}/sendMessage", self.api_url);

            let mut payload = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": "Markdown",
            });

            if let Some(reply_to_message_id) = reply_to {
                if i == 0 {
                    payload["reply_to_message_id"] = serde_json::json!(reply_to_message_id);
                }
            }

            if i == chunks.len() - 1 {
                if let Some(markup) = reply_markup {
                    payload["reply_markup"] = serde_json::to_value(markup)?;
                }
            }

            self.send_with_markdown_fallback(&url, payload).await?;
        }

        Ok(())
    }

    pub async fn edit_message_text(
        &self,
        business_connection_id: Option<&str>,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        // editMessageText cannot be split into chunks: fallback to a new message if too long.
        if text.chars().count() > TELEGRAM_MAX_MESSAGE_LEN {
            return self.send_message(chat_id, text, None, reply_markup).await;
        }

        let url = format!("{}/editMessageText", self.api_url);

        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        if let Some(connection_id) = business_connection_id {
            payload["business_connection_id"] = serde_json::json!(connection_id);
        }

        if let Some(markup) = reply_markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }

        self.send_with_markdown_fallback(&url, payload).await
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<()> {
        let url = format!("{}/answerCallbackQuery", self.api_url);

        let mut payload = serde_json::json!({
            "callback_query_id": callback_query_id,
        });

        if let Some(t) = text {
            payload["text"] = serde_json::json!(t);
        }

        let _ = self.client.post(&url).json(&payload).send().await;
        Ok(())
    }

    pub async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        title: &str,
        message_text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let url = format!("{}/answerInlineQuery", self.api_url);

        let mut article = serde_json::json!({
            "type": "article",
            "id": "1",
            "title": title,
            "input_message_content": {
                "message_text": message_text,
                "parse_mode": "Markdown",
            },
        });

        if let Some(markup) = reply_markup {
            article["reply_markup"] = serde_json::to_value(markup)?;
        }

        let payload = serde_json::json!({
            "inline_query_id": inline_query_id,
            "results": [article],
            "cache_time": 5,
        });

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram answerInlineQuery request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "telegram answerInlineQuery HTTP {}: {}",
                status,
                body
            ));
        }

        Ok(())
    }

    pub async fn leave_chat(&self, chat_id: i64) -> Result<()> {
        let url = format!("{}/leaveChat", self.api_url);
        let payload = serde_json::json!({ "chat_id": chat_id });

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram leaveChat request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("telegram leaveChat HTTP {}: {}", status, body));
        }

        Ok(())
    }

    /// Resolve a public @username to its chat. Unknown or malformed
    /// usernames come back as [`LookupError::NotFound`].
    pub async fn get_chat(&self, username: &str) -> Result<Chat, LookupError> {
        let url = format!("{}/getChat", self.api_url);
        let handle = format!("@{}", username.trim_start_matches('@'));
        let payload = serde_json::json!({ "chat_id": handle });

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram getChat request failed: {}", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(LookupError::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("telegram getChat HTTP {}: {}", status, body).into());
        }

        let parsed: ApiResponse<Chat> = resp
            .json()
            .await
            .map_err(|e| anyhow!("telegram getChat decode failed: {}", e))?;

        if !parsed.ok {
            warn!(
                "telegram getChat returned ok=false: {:?}",
                parsed.description
            );
            return Err(LookupError::NotFound);
        }

        parsed
            .result
            .ok_or_else(|| LookupError::Api(anyhow!("telegram getChat returned no result")))
    }

    async fn send_with_markdown_fallback(
        &self,
        url: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let endpoint = url.rsplit('/').next().unwrap_or("telegram");

        let first_resp = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram {} request failed: {}", endpoint, e))?;

        if first_resp.status().is_success() {
            let parsed: ApiResponse<serde_json::Value> = first_resp
                .json()
                .await
                .map_err(|e| anyhow!("telegram {} decode failed: {}", endpoint, e))?;
            if parsed.ok {
                return Ok(());
            }
            warn!(
                "telegram {} returned ok=false with Markdown payload, retrying without parse_mode",
                endpoint
            );
        } else {
            let status = first_resp.status();
            let body = first_resp.text().await.unwrap_or_default();
            warn!(
                "telegram {} HTTP {} with Markdown payload, retrying without parse_mode: {}",
                endpoint, status, body
            );
        }

        let mut fallback_payload = payload;
        if let Some(obj) = fallback_payload.as_object_mut() {
            obj.remove("parse_mode");
        }

        let fallback_resp = self
            .client
            .post(url)
            .json(&fallback_payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram {} fallback request failed: {}", endpoint, e))?;

        if !fallback_resp.status().is_success() {
            let status = fallback_resp.status();
            let body = fallback_resp.text().await.unwrap_or_default();
            if is_reply_target_missing(&body) {
                let mut no_reply_payload = fallback_payload.clone();
                if remove_reply_to_message_id(&mut no_reply_payload) {
                    warn!(
                        "telegram {} fallback failed due to missing reply target; retrying without reply_to_message_id",
                        endpoint
                    );
                    return self
                        .send_without_reply_target(url, endpoint, no_reply_payload)
                        .await;
                }
            }
            return Err(anyhow!(
                "telegram {} fallback HTTP {}: {}",
                endpoint,
                status,
                body
            ));
        }

        let parsed: ApiResponse<serde_json::Value> = fallback_resp
            .json()
            .await
            .map_err(|e| anyhow!("telegram {} fallback decode failed: {}", endpoint, e))?;
        if !parsed.ok {
            return Err(anyhow!("telegram {} fallback returned ok=false", endpoint));
        }

        Ok(())
    }

    async fn send_without_reply_target(
        &self,
        url: &str,
        endpoint: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let resp = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram {} no-reply retry request failed: {}", endpoint, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "telegram {} no-reply retry HTTP {}: {}",
                endpoint,
                status,
                body
            ));
        }

        let parsed: ApiResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| anyhow!("telegram {} no-reply retry decode failed: {}", endpoint, e))?;
        if !parsed.ok {
            return Err(anyhow!(
                "telegram {} no-reply retry returned ok=false",
                endpoint
            ));
        }

        Ok(())
    }

    /// Long-poll loop. Each received update is handed to `on_update`; the
    /// offset is persisted before handling so redelivery after a crash is
    /// bounded to the in-flight update.
    pub async fn poll<F, Fut>(&self, mut on_update: F) -> Result<()>
    where
        F: FnMut(Update) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut offset: Option<i64> = self.read_offset().await;

        info!(offset = ?offset, "Telegram polling started");

        let mut client = self.client.clone();
        let mut client_recreate_at =
            Instant::now() + Duration::from_secs(self.client_recreate_interval_secs);

        loop {
            if Instant::now() >= client_recreate_at {
                info!("Recreating HTTP client to prevent stale connections");
                client = Self::build_client();
                client_recreate_at =
                    Instant::now() + Duration::from_secs(self.client_recreate_interval_secs);
            }

            let updates = match self.get_updates(&client, offset).await {
                Ok(v) => v,
                Err(err) => {
                    warn!("Telegram polling error: {}", err);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    continue;
                }
            };

            for update in updates {
                offset = Some(update.update_id + 1);
                self.write_offset(update.update_id + 1).await;
                on_update(update).await;
            }
        }
    }
}

fn remove_reply_to_message_id(payload: &mut serde_json::Value) -> bool {
    payload
        .as_object_mut()
        .map(|obj| obj.remove("reply_to_message_id").is_some())
        .unwrap_or(false)
}

fn is_reply_target_missing(body: &str) -> bool {
    body.to_ascii_lowercase()
        .contains("message to be replied not found")
}

fn chunk_message(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= TELEGRAM_MAX_MESSAGE_LEN {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = (start + TELEGRAM_MAX_MESSAGE_LEN).min(chars.len());

        if end < chars.len() {
            let mut split = end;
            for i in (start..end).rev() {
                let c = chars[i];
                if c == '\n' || c == ' ' || c == '.' || c == '!' || c == '?' {
                    split = i + 1;
                    break;
                }
            }
            if split > start {
                end = split;
            }
        }

        chunks.push(chars[start..end].iter().collect::<String>());
        start = end;
    }

    chunks
}
