use std::sync::RwLock;

use crate::config::Config;

/// Runtime-mutable configuration keys exposed through the settings flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    WebhookUrl,
    AllowedUsers,
    TelegramChatId,
    DiscordWebhookUrl,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::WebhookUrl,
        SettingKey::AllowedUsers,
        SettingKey::TelegramChatId,
        SettingKey::DiscordWebhookUrl,
    ];

    /// Stable token used in callback data.
    pub fn token(&self) -> &'static str {
        match self {
            SettingKey::WebhookUrl => "webhook_url",
            SettingKey::AllowedUsers => "allowed_users",
            SettingKey::TelegramChatId => "telegram_chat_id",
            SettingKey::DiscordWebhookUrl => "discord_webhook_url",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.token() == token)
    }

    /// Human-readable label for the settings keyboard.
    pub fn label(&self) -> &'static str {
        match self {
            SettingKey::WebhookUrl => "Global Webhook URL",
            SettingKey::AllowedUsers => "Allowed Users",
            SettingKey::TelegramChatId => "Telegram Chat ID",
            SettingKey::DiscordWebhookUrl => "Discord Webhook URL",
        }
    }
}

struct LiveSettings {
    webhook_url: String,
    allowed_users: Vec<String>,
    telegram_chat_id: String,
    discord_webhook_url: String,
}

/// Process-local mutable settings, seeded from the config file.
///
/// Reads vastly outnumber writes and nothing holds the lock across an await,
/// so a plain RwLock is enough.
pub struct SettingsStore {
    inner: RwLock<LiveSettings>,
}

impl SettingsStore {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inner: RwLock::new(LiveSettings {
                webhook_url: config.webhook.url.clone(),
                allowed_users: config.telegram.allowed_usernames.clone(),
                telegram_chat_id: config.telegram.chat_id.clone(),
                discord_webhook_url: config
                    .discord
                    .as_ref()
                    .map(|d| d.webhook_url.clone())
                    .unwrap_or_default(),
            }),
        }
    }

    /// Case-sensitive allow-list membership test.
    pub fn is_allowed_user(&self, username: &str) -> bool {
        let inner = self.inner.read().expect("settings lock poisoned");
        inner.allowed_users.iter().any(|u| u == username)
    }

    pub fn webhook_url(&self) -> String {
        self.inner
            .read()
            .expect("settings lock poisoned")
            .webhook_url
            .clone()
    }

    pub fn telegram_chat_id(&self) -> String {
        self.inner
            .read()
            .expect("settings lock poisoned")
            .telegram_chat_id
            .clone()
    }

    pub fn discord_webhook_url(&self) -> String {
        self.inner
            .read()
            .expect("settings lock poisoned")
            .discord_webhook_url
            .clone()
    }

    /// Render the current value of a key as operator-facing text.
    /// Multi-valued keys are rendered comma-separated.
    pub fn get(&self, key: SettingKey) -> String {
        let inner = self.inner.read().expect("settings lock poisoned");
        match key {
            SettingKey::WebhookUrl => inner.webhook_url.clone(),
            SettingKey::AllowedUsers => inner.allowed_users.join(", "),
            SettingKey::TelegramChatId => inner.telegram_chat_id.clone(),
            SettingKey::DiscordWebhookUrl => inner.discord_webhook_url.clone(),
        }
    }

    /// Apply raw operator text as the new value for a key.
    /// Multi-valued keys are split on commas and trimmed; empty items dropped.
    pub fn set(&self, key: SettingKey, raw: &str) {
        let mut inner = self.inner.write().expect("settings lock poisoned");
        match key {
            SettingKey::WebhookUrl => inner.webhook_url = raw.trim().to_string(),
            SettingKey::AllowedUsers => {
                inner.allowed_users = raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            SettingKey::TelegramChatId => inner.telegram_chat_id = raw.trim().to_string(),
            SettingKey::DiscordWebhookUrl => {
                inner.discord_webhook_url = raw.trim().to_string()
            }
        }
    }
}
