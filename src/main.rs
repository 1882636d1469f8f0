//! Price Notifier Bot - Main Entry Point
//!
//! A Telegram bot that sends the current price of a crypto asset to each
//! chat with an active session, on a per-chat interval.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use price_notifier_bot::commands::CommandDispatcher;
use price_notifier_bot::config::{BotSettings, TelegramConfig};
use price_notifier_bot::ports::{BotServices, Transport};
use price_notifier_bot::quote::{CoinCapClient, FileHistoryLog};
use price_notifier_bot::session::SessionRegistry;
use price_notifier_bot::telegram::TelegramTransport;

/// Telegram bot for periodic crypto price notifications.
#[derive(Parser, Debug)]
#[command(name = "price_notifier_bot")]
#[command(about = "Send crypto asset prices to Telegram chats on a schedule")]
#[command(version)]
struct Args {
    /// File holding the bot token when TELEGRAM_BOT_TOKEN is unset.
    #[arg(short, long, default_value = "bot_token.txt")]
    token_file: PathBuf,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::load(Some(&args.token_file))
        .context("Failed to load Telegram configuration")?;
    let settings =
        BotSettings::from_env_with_defaults().context("Failed to load bot settings")?;

    info!(
        "Tracking {} via {} (history: {})",
        settings.asset_symbol,
        settings.quote_api_url,
        settings.history_path.display()
    );

    let transport = TelegramTransport::connect(&tg_config, settings.send_min_interval())
        .await
        .context("Failed to connect to Telegram")?;

    if let Err(e) = transport.register_commands().await {
        warn!("{}", e);
    }

    let quotes = CoinCapClient::new(
        settings.quote_api_url.clone(),
        settings.quote_api_key.clone(),
        settings.quote_timeout(),
    )
    .context("Failed to build quote client")?;
    let history = FileHistoryLog::new(settings.history_path.clone());

    let transport = Arc::new(transport);
    let outbound: Arc<dyn Transport> = Arc::clone(&transport) as Arc<dyn Transport>;
    let services = Arc::new(BotServices::new(
        outbound,
        Arc::new(quotes),
        Arc::new(history),
        settings.asset_symbol.clone(),
    ));
    let registry = Arc::new(SessionRegistry::new(services));
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&registry)));

    info!("Bot is running. Use Ctrl+C to stop.");
    transport.run(dispatcher).await;

    info!("Shutting down {} session(s)...", registry.len());
    registry.shutdown().await;

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
