pub mod discord;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// Which rendition of a notification a destination accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatting {
    /// Inline HTML markup (bold, links).
    Rich,
    /// Markup stripped.
    Plain,
}

/// A destination capable of delivering one formatted notification.
/// Adapters are long-lived shared handles; `send` must not retain state.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable destination identifier (e.g. "telegram", "discord").
    fn name(&self) -> &'static str;

    /// The rendition this destination accepts.
    fn formatting(&self) -> Formatting;

    /// Deliver one already-rendered message.
    async fn send(&self, text: &str) -> Result<()>;
}
