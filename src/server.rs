use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::channel::ChannelAdapter;
use crate::event::{Envelope, WebhookEvent};
use crate::notify::{dispatch, format};

pub struct WebhookState {
    pub destinations: Vec<Arc<dyn ChannelAdapter>>,
}

/// Run the webhook ingress server until the process exits.
pub async fn run(state: Arc<WebhookState>, port: u16) -> Result<()> {
    let app = Router::new()
        .route("/webhook", post(handle_webhook))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind webhook server to port {}", port))?;

    info!("Webhook server listening on port {}", port);

    axum::serve(listener, app)
        .await
        .context("Webhook server failed")?;

    Ok(())
}

/// One inbound registry event: decode, format, fan out. The acknowledgment
/// is independent of delivery outcomes; those are logged by the dispatcher.
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    Json(envelope): Json<Envelope>,
) -> (StatusCode, Json<Value>) {
    info!(
        "Received webhook event '{}' from monitor {}",
        envelope.event, envelope.meta.monitor_id
    );

    let event = WebhookEvent::from_envelope(envelope);
    let message = format::format(&event);
    let outcomes = dispatch::dispatch(&message, &state.destinations).await;

    let delivered = outcomes.iter().filter(|d| d.ok).count();
    info!("Delivered to {}/{} destinations", delivered, outcomes.len());

    (StatusCode::OK, Json(json!({ "status": "success" })))
}
