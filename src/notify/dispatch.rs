use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use crate::channel::{ChannelAdapter, Formatting};
use crate::notify::format::NotificationMessage;

/// Outcome of one destination's delivery attempt.
#[derive(Debug)]
pub struct Delivery {
    pub destination: &'static str,
    pub ok: bool,
    pub error: Option<String>,
}

/// Fan one notification out to every destination. Sends run concurrently
/// and each failure is isolated: it is recorded in that destination's
/// outcome and never affects the others or the caller.
pub async fn dispatch(
    message: &NotificationMessage,
    destinations: &[Arc<dyn ChannelAdapter>],
) -> Vec<Delivery> {
    let sends = destinations.iter().map(|adapter| {
        let text = match adapter.formatting() {
            Formatting::Rich => &message.rich,
            Formatting::Plain => &message.plain,
        };
        async move {
            match adapter.send(text).await {
                Ok(()) => {
                    info!("Notification delivered to {}", adapter.name());
                    Delivery {
                        destination: adapter.name(),
                        ok: true,
                        error: None,
                    }
                }
                Err(e) => {
                    error!("Failed to deliver to {}: {:#}", adapter.name(), e);
                    Delivery {
                        destination: adapter.name(),
                        ok: false,
                        error: Some(format!("{:#}", e)),
                    }
                }
            }
        }
    });

    join_all(sends).await
}
