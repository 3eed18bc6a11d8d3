use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    pub socialdata: SocialDataConfig,
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Chat that receives monitor notifications.
    pub chat_id: String,
    pub allowed_usernames: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// Discord channel webhook URL for notification delivery.
    pub webhook_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SocialDataConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
}

impl SocialDataConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical SocialData API endpoint.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        "https://api.socialdata.tools"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebhookConfig {
    /// Public URL the upstream registry should deliver events to
    /// (e.g. an ngrok tunnel with the /webhook path). Registered on startup.
    #[serde(default)]
    pub url: String,
}

fn default_port() -> u16 {
    3000
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        port: default_port(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
