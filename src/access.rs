use std::sync::Arc;

use crate::settings::SettingsStore;

/// Reply sent to anyone not on the allow-list.
pub const REJECTION_MESSAGE: &str = "🚫 Sorry, you are not authorized to use this bot.";

/// The identity behind an incoming operator interaction.
/// Telegram usernames are matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Membership gate over the live allow-list. Checked at every conversation
/// entry point before any state mutation or external call.
pub struct AccessControl {
    settings: Arc<SettingsStore>,
}

impl AccessControl {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    pub fn is_allowed(&self, who: &Identity) -> bool {
        self.settings.is_allowed_user(&who.username)
    }
}
