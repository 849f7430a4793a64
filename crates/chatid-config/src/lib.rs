//! Chatid Configuration
//!
//! TOML configuration loading with environment variable support

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TOKEN_ENV_VAR: &str = "CHATID_BOT_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    pub data_dir: Option<String>,
    pub log_level: Option<String>,
    /// Language used for requesters with no stored preference.
    #[serde(default = "default_language")]
    pub default_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Username of the bot account, without the leading '@'. Used to build
    /// deep links, so it must match the token's account.
    #[serde(default)]
    pub bot_username: String,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_client_recreate")]
    pub client_recreate_interval_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            bot_username: String::new(),
            poll_timeout_secs: default_poll_timeout(),
            client_recreate_interval_secs: default_client_recreate(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_poll_timeout() -> u64 {
    60
}

fn default_client_recreate() -> u64 {
    3600
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config {}", path.as_ref().display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.as_ref().display()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults plus the
    /// token env var when no file exists yet.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load(path)
        } else {
            let mut config = Config::default();
            config.apply_env();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| anyhow!("no config directory available"))?;
        Ok(base.join("chatid").join("config.toml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.core.data_dir {
            return Ok(PathBuf::from(dir));
        }
        let base = dirs::data_dir().ok_or_else(|| anyhow!("no data directory available"))?;
        Ok(base.join("chatid"))
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                self.telegram.bot_token = token.trim().to_string();
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            return Err(anyhow!(
                "bot token missing: set telegram.bot_token or {}",
                TOKEN_ENV_VAR
            ));
        }
        Ok(())
    }
}
