use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

use crate::channel::{ChannelAdapter, Formatting};
use crate::settings::SettingsStore;

/// Delivers notifications to the configured Telegram chat with HTML markup.
pub struct TelegramChannel {
    bot: Bot,
    settings: Arc<SettingsStore>,
}

impl TelegramChannel {
    pub fn new(bot: Bot, settings: Arc<SettingsStore>) -> Self {
        Self { bot, settings }
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn formatting(&self) -> Formatting {
        Formatting::Rich
    }

    async fn send(&self, text: &str) -> Result<()> {
        // Routing id is read per send so settings changes apply immediately.
        let chat_id: i64 = self
            .settings
            .telegram_chat_id()
            .parse()
            .context("Telegram chat id is not a valid integer")?;

        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .context("Failed to send Telegram message")?;

        Ok(())
    }
}
