use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::channel::{ChannelAdapter, Formatting};
use crate::settings::SettingsStore;

/// Delivers notifications to a Discord channel webhook as plain text.
pub struct DiscordChannel {
    client: reqwest::Client,
    settings: Arc<SettingsStore>,
}

impl DiscordChannel {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl ChannelAdapter for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn formatting(&self) -> Formatting {
        Formatting::Plain
    }

    async fn send(&self, text: &str) -> Result<()> {
        let url = self.settings.discord_webhook_url();
        if url.is_empty() {
            anyhow::bail!("Discord webhook URL is not configured");
        }

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .context("Failed to send Discord message")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord webhook error ({}): {}", status, body);
        }

        Ok(())
    }
}
