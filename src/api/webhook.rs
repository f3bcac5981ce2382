//! WhatsApp webhook endpoints
//!
//! GET verifies the subscription handshake. POST ingests inbound messages,
//! runs them through the reconciler, and fires acknowledgment sends. The
//! POST handler takes the raw body and answers 200 no matter what, so Meta
//! never retries a delivery because of our own parse or store failures.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rollcall_core::{ReconcileOutcome, Reconciler};
use rollcall_whatsapp::webhook::{extract_events, WebhookEnvelope};
use rollcall_whatsapp::{ack, WhatsAppClient};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Webhook verification query
#[derive(Debug, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Verify webhook subscription (GET)
///
/// Meta sends this request during webhook setup to verify ownership.
async fn webhook_verify(
    Query(query): Query<WebhookVerifyQuery>,
    Extension(whatsapp): Extension<Arc<WhatsAppClient>>,
) -> impl IntoResponse {
    let mode = query.mode.as_deref().unwrap_or("");
    let token = query.verify_token.as_deref().unwrap_or("");
    let challenge = query.challenge.as_deref().unwrap_or("");

    match whatsapp.verify_webhook(mode, token, challenge) {
        Some(c) => c.into_response(),
        None => {
            warn!("webhook verification failed");
            (StatusCode::FORBIDDEN, "Verification failed").into_response()
        }
    }
}

/// Ingest inbound messages (POST)
async fn webhook_receive(
    Extension(reconciler): Extension<Reconciler>,
    Extension(whatsapp): Extension<Arc<WhatsAppClient>>,
    body: String,
) -> impl IntoResponse {
    if let Err(e) = process_delivery(&reconciler, &whatsapp, &body).await {
        error!(error = %e, "failed to process webhook delivery");
    }
    // Always 200 so Meta does not retry the event
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

async fn process_delivery(
    reconciler: &Reconciler,
    whatsapp: &Arc<WhatsAppClient>,
    body: &str,
) -> anyhow::Result<()> {
    let envelope: WebhookEnvelope = serde_json::from_str(body)?;
    let events = extract_events(&envelope);

    for event in events {
        let outcome = reconciler.reconcile(&event).await?;
        info!(
            phone = %event.sender_phone,
            kind = ?event.kind,
            outcome = ?outcome,
            "inbound event reconciled"
        );

        // Acknowledgments are fire-and-forget: a failed send never affects
        // the recorded reply, and already-answered contacts stay silent
        let ack_text = match outcome {
            ReconcileOutcome::Recorded(_) => Some(ack::thank_you_text()),
            ReconcileOutcome::InvalidReply => Some(ack::invalid_reply_text()),
            ReconcileOutcome::AlreadyAnswered(_) | ReconcileOutcome::UnknownContact => None,
        };
        if let Some(text) = ack_text {
            let client = whatsapp.clone();
            let to = event.sender_phone.clone();
            tokio::spawn(async move {
                if let Err(e) = client.send_text(&to, text).await {
                    error!(to = %to, error = %e, "acknowledgment send failed");
                }
            });
        }
    }

    Ok(())
}

/// Create webhook routes
pub fn webhook_routes() -> Router {
    Router::new().route("/webhook", get(webhook_verify).post(webhook_receive))
}
