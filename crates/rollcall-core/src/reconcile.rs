//! Reconciler - turns inbound events into durable reply state
//!
//! One entry point, `reconcile`, applies the classifier to an inbound event
//! and records the decision through the store's atomic reply write. Running
//! the same event twice (provider redelivery) converges on the same state.

use std::sync::Arc;

use crate::classify::{classify, Classification};
use crate::contact::Decision;
use crate::error::Result;
use crate::event::InboundEvent;
use crate::store::{ContactStore, ReplyWrite};
use chrono::Utc;
use tracing::{info, warn};

/// What happened to one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new terminal answer was recorded
    Recorded(Decision),
    /// The contact had already answered; the stored decision is returned
    AlreadyAnswered(Decision),
    /// The text did not classify as yes or no; nothing was written
    InvalidReply,
    /// No contact matches the sender phone; nothing was written
    UnknownContact,
}

/// Applies inbound events against the contact store
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ContactStore>,
}

impl Reconciler {
    /// Create a reconciler over a store
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Classify the event and record the decision.
    ///
    /// Invalid replies are checked against the store so the caller can tell
    /// "unknown sender" from "known sender who typed something else" and
    /// from "already answered, no acknowledgment needed".
    pub async fn reconcile(&self, event: &InboundEvent) -> Result<ReconcileOutcome> {
        let decision = match classify(event.text.as_deref()) {
            Classification::Yes => Decision::Yes,
            Classification::No => Decision::No,
            Classification::Invalid => {
                return match self.store.find(&event.sender_phone).await? {
                    None => {
                        warn!(phone = %event.sender_phone, "reply from unknown sender");
                        Ok(ReconcileOutcome::UnknownContact)
                    }
                    // Terminal contacts stay silent on follow-up chatter
                    Some(contact) => match contact.reply_state.decision() {
                        Some(prior) => Ok(ReconcileOutcome::AlreadyAnswered(prior)),
                        None => Ok(ReconcileOutcome::InvalidReply),
                    },
                };
            }
        };

        let correlation = event.audit_correlation();
        let write = self
            .store
            .record_reply(&event.sender_phone, decision, &correlation, Utc::now())
            .await?;

        Ok(match write {
            ReplyWrite::Recorded => {
                info!(
                    phone = %event.sender_phone,
                    decision = decision.as_str(),
                    correlation = %correlation,
                    "reply recorded"
                );
                ReconcileOutcome::Recorded(decision)
            }
            ReplyWrite::AlreadyAnswered(prior) => {
                info!(
                    phone = %event.sender_phone,
                    prior = prior.as_str(),
                    "duplicate reply ignored"
                );
                ReconcileOutcome::AlreadyAnswered(prior)
            }
            ReplyWrite::NotFound => {
                warn!(phone = %event.sender_phone, "reply from unknown sender");
                ReconcileOutcome::UnknownContact
            }
        })
    }
}
