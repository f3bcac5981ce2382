//! Webhook payload types and event extraction
//!
//! The Cloud API posts a nested envelope: entry[] -> changes[] -> value with
//! messages and delivery statuses. `extract_events` flattens it into
//! [`InboundEvent`]s, one per user action, skipping media and delivery
//! receipts.

use chrono::{DateTime, Utc};
use rollcall_core::{InboundEvent, InboundKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Incoming webhook envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Object type (should be "whatsapp_business_account")
    pub object: String,
    /// Entry array
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

/// Webhook entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEntry {
    /// Business Account ID
    pub id: String,
    /// Changes array
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

/// Webhook change event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChange {
    /// Value containing the actual message data
    pub value: WebhookValue,
    /// Field name ("messages" for inbound traffic)
    pub field: String,
}

/// Webhook value containing message data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookValue {
    /// Messaging product
    #[serde(default)]
    pub messaging_product: String,
    /// Messages
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
    /// Statuses (delivery receipts, ignored)
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

/// One inbound message in a webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookMessage {
    /// Sender phone number (wa_id, digits only)
    pub from: String,
    /// Provider message id
    pub id: String,
    /// Unix timestamp as a string
    #[serde(default)]
    pub timestamp: String,
    /// Message type
    #[serde(rename = "type")]
    pub message_type: String,
    /// Text content (for text messages)
    pub text: Option<TextContent>,
    /// Quick-reply button on a template message
    pub button: Option<ButtonContent>,
    /// Interactive message reply
    pub interactive: Option<InteractiveContent>,
}

/// Text content in a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Message body
    pub body: String,
}

/// Template quick-reply button content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonContent {
    /// Developer-defined payload (e.g. "btn_si")
    #[serde(default)]
    pub payload: String,
    /// Button label as shown to the user
    #[serde(default)]
    pub text: String,
}

/// Interactive message reply content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveContent {
    /// Interactive reply type
    #[serde(rename = "type", default)]
    pub interactive_type: String,
    /// Button reply
    pub button_reply: Option<InteractiveReply>,
    /// List reply
    pub list_reply: Option<InteractiveReply>,
    /// Flow response
    pub nfm_reply: Option<serde_json::Value>,
}

/// A selected interactive button or list row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveReply {
    /// Developer-defined id
    pub id: String,
    /// Title as shown to the user
    #[serde(default)]
    pub title: String,
}

fn parse_unix_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Flatten a webhook envelope into inbound events.
///
/// Text messages carry their body as text with no correlation id (the echoed
/// text serves downstream). Button and interactive replies carry the
/// developer-defined id as the correlation id and the label as text, so the
/// classifier sees "Sí"/"No" either way. Unhandled kinds (media, reactions,
/// delivery statuses) are skipped.
#[must_use]
pub fn extract_events(envelope: &WebhookEnvelope) -> Vec<InboundEvent> {
    let mut events = Vec::new();

    for entry in &envelope.entry {
        for change in &entry.changes {
            if change.field != "messages" {
                continue;
            }
            for msg in &change.value.messages {
                let Some(event) = message_to_event(msg) else {
                    debug!(kind = %msg.message_type, "skipping unhandled message kind");
                    continue;
                };
                events.push(event);
            }
        }
    }

    events
}

fn message_to_event(msg: &WebhookMessage) -> Option<InboundEvent> {
    let base = |kind| {
        let mut event = InboundEvent::new(&msg.from, kind, &msg.id);
        if let Some(ts) = parse_unix_timestamp(&msg.timestamp) {
            event = event.with_timestamp(ts);
        }
        event
    };

    match msg.message_type.as_str() {
        "text" => {
            let body = msg.text.as_ref()?.body.clone();
            Some(base(InboundKind::Text).with_text(body))
        }
        "button" => {
            let button = msg.button.as_ref()?;
            Some(
                base(InboundKind::Button)
                    .with_text(&button.text)
                    .with_correlation_id(&button.payload),
            )
        }
        "interactive" => {
            let interactive = msg.interactive.as_ref()?;
            if let Some(reply) = &interactive.button_reply {
                Some(
                    base(InboundKind::InteractiveButton)
                        .with_text(&reply.title)
                        .with_correlation_id(&reply.id),
                )
            } else if let Some(reply) = &interactive.list_reply {
                Some(
                    base(InboundKind::InteractiveList)
                        .with_text(&reply.title)
                        .with_correlation_id(&reply.id),
                )
            } else if interactive.nfm_reply.is_some() {
                // Flow responses carry structured data we don't classify
                Some(base(InboundKind::Flow))
            } else {
                None
            }
        }
        _ => None,
    }
}
