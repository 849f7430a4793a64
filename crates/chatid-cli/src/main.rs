//! Chatid CLI
//!
//! Wires configuration, storage, logging and the Telegram client into the
//! event handler and runs the long-polling loop

mod logging;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use chatid_config::Config;
use chatid_core::EventHandler;
use chatid_i18n::Language;
use chatid_storage::Storage;
use chatid_telegram::TelegramClient;

#[derive(Parser)]
#[command(name = "chatid", version, about = "Telegram bot that resolves chat IDs")]
struct Cli {
    /// Path to config.toml (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Print the default config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::ConfigPath => {
            println!("{}", Config::default_path()?.display());
            Ok(())
        }
        Commands::Run => run(cli.config).await,
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let log_level = config.core.log_level.as_deref().unwrap_or("info");
    let _logging_guard = logging::init_logging(&data_dir.join("logs"), log_level)?;

    info!(data_dir = %data_dir.display(), "starting chatid");

    let storage = Arc::new(Mutex::new(Storage::new(data_dir.join("chatid.db"))?));
    let default_lang: Language = config.core.default_language.parse().unwrap_or_default();

    let client = TelegramClient::new(
        &config.telegram.bot_token,
        &config.telegram.bot_username,
        data_dir,
        config.telegram.poll_timeout_secs,
        config.telegram.client_recreate_interval_secs,
    );

    let handler = EventHandler::new(client, storage, default_lang);
    handler
        .transport()
        .poll(|update| handler.handle_update(update))
        .await
}
