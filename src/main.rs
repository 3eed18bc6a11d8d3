mod access;
mod bot;
mod channel;
mod config;
mod event;
mod notify;
mod server;
mod settings;
mod socialdata;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::engine::ConversationEngine;
use crate::channel::{discord::DiscordChannel, telegram::TelegramChannel, ChannelAdapter};
use crate::config::Config;
use crate::settings::SettingsStore;
use crate::socialdata::{MonitorRegistry, SocialDataClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,birdwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Allowed users: {:?}", config.telegram.allowed_usernames);
    info!("  Discord delivery: {}", config.discord.is_some());
    info!("  Webhook port: {}", config.server.port);

    let settings = Arc::new(SettingsStore::from_config(&config));
    let registry: Arc<dyn MonitorRegistry> =
        Arc::new(SocialDataClient::new(config.socialdata.clone()));

    let bot = Bot::new(&config.telegram.bot_token);

    // Notification destinations; Telegram always, Discord when configured.
    let mut destinations: Vec<Arc<dyn ChannelAdapter>> =
        vec![Arc::new(TelegramChannel::new(bot.clone(), settings.clone()))];
    if config.discord.is_some() {
        destinations.push(Arc::new(DiscordChannel::new(settings.clone())));
    }

    // Point the upstream registry at our webhook; failure is logged, not fatal.
    let webhook_url = settings.webhook_url();
    if !webhook_url.is_empty() {
        match registry.set_global_webhook(&webhook_url).await {
            Ok(()) => info!("Global webhook registered: {}", webhook_url),
            Err(e) => error!("Failed to register global webhook: {:#}", e),
        }
    }

    // Webhook ingress runs alongside the bot.
    let server_state = Arc::new(server::WebhookState { destinations });
    let port = config.server.port;
    tokio::spawn(async move {
        if let Err(e) = server::run(server_state, port).await {
            error!("Webhook server exited: {:#}", e);
        }
    });

    let engine = Arc::new(ConversationEngine::new(registry, settings));

    info!("Bot is starting...");
    bot::run(engine, bot).await?;

    Ok(())
}
