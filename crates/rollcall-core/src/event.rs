//! InboundEvent - one user action delivered by the provider webhook
//!
//! Ephemeral: produced per webhook delivery and handed to the reconciler,
//! never persisted. The provider may deliver the same logical action more
//! than once; the reconciler tolerates duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of inbound message the provider delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundKind {
    /// Plain text message
    Text,
    /// Quick-reply button on a template message
    Button,
    /// Interactive message button reply
    InteractiveButton,
    /// Interactive list selection
    InteractiveList,
    /// WhatsApp Flow response
    Flow,
}

/// A single inbound user action extracted from a webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Sender phone as delivered (wa_id, digits only)
    pub sender_phone: String,
    /// Message kind
    pub kind: InboundKind,
    /// Extractable text, if the kind carries any
    pub text: Option<String>,
    /// Button/list id or quick-reply payload; `None` for plain text, where
    /// the echoed text serves as the correlation id downstream
    pub correlation_id: Option<String>,
    /// Provider message id of the inbound message
    pub provider_message_id: String,
    /// Provider timestamp of the message
    pub timestamp: Option<DateTime<Utc>>,
}

impl InboundEvent {
    /// Create an event with the minimum required fields
    #[must_use]
    pub fn new(
        sender_phone: impl Into<String>,
        kind: InboundKind,
        provider_message_id: impl Into<String>,
    ) -> Self {
        Self {
            sender_phone: sender_phone.into(),
            kind,
            text: None,
            correlation_id: None,
            provider_message_id: provider_message_id.into(),
            timestamp: None,
        }
    }

    /// Set the extracted text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the correlation id (button id / payload)
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the provider timestamp
    #[must_use]
    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Correlation id for audit: the explicit id when present, otherwise the
    /// echoed text
    #[must_use]
    pub fn audit_correlation(&self) -> String {
        self.correlation_id
            .clone()
            .or_else(|| self.text.clone())
            .unwrap_or_default()
    }
}
