//! Contact store - durable mapping from phone to contact and tracking state
//!
//! Two implementations share one trait: a flat delimited file (the operator
//! can open it in a spreadsheet) and a SQLite database. All mutations go
//! through a critical section owned by the store, so read-check-write
//! sequences never interleave for the same contact.

pub mod flatfile;
pub mod sqlite;
pub mod table;

use crate::contact::{Contact, Decision};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of an atomic reply write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyWrite {
    /// The decision was recorded (the contact was in `NoReply`)
    Recorded,
    /// A terminal answer already existed; nothing was written
    AlreadyAnswered(Decision),
    /// No contact with that phone exists; nothing was written
    NotFound,
}

/// Result of one outbound send attempt, checkpointed per contact
#[derive(Debug, Clone)]
pub enum SendRecord {
    /// Provider accepted the message
    Sent {
        /// Provider message id (required for the `Sent` state)
        message_id: String,
        /// When the send happened
        at: DateTime<Utc>,
    },
    /// The attempt failed; the contact stays eligible for a later pass
    Failed {
        /// Provider error text
        error: String,
        /// When the attempt happened
        at: DateTime<Utc>,
    },
}

/// Aggregate counters over the whole store
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Total contacts
    pub total: u64,
    /// Contacts with a successful send
    pub sent: u64,
    /// Contacts whose last send attempt failed
    pub errors: u64,
    /// Contacts not yet attempted
    pub pending: u64,
    /// Contacts that confirmed
    pub replied_yes: u64,
    /// Contacts that declined
    pub replied_no: u64,
}

/// Durable contact roster with tracking state.
///
/// `record_reply` is the store's atomic read-check-write: the terminal-state
/// check and the write happen under the same lock (or in a single conditional
/// SQL statement), so concurrent webhook deliveries cannot both pass the
/// `NoReply` check.
#[async_trait::async_trait]
pub trait ContactStore: Send + Sync {
    /// Load every contact in stable store order
    async fn load(&self) -> Result<Vec<Contact>>;

    /// Replace the whole roster (bulk writes after a batch pass)
    async fn save(&self, contacts: &[Contact]) -> Result<()>;

    /// Find a contact by phone (normalized digits-only comparison)
    async fn find(&self, phone: &str) -> Result<Option<Contact>>;

    /// Insert or merge a contact keyed on (phone, cohort). Roster fields are
    /// overwritten; a terminal reply on the existing record is preserved.
    async fn upsert(&self, contact: Contact) -> Result<()>;

    /// Atomically record a reply decision for the contact with this phone
    async fn record_reply(
        &self,
        phone: &str,
        decision: Decision,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ReplyWrite>;

    /// Record the outcome of a send attempt (per-contact checkpoint)
    async fn record_send(
        &self,
        phone: &str,
        cohort_id: Option<&str>,
        record: SendRecord,
    ) -> Result<()>;

    /// Aggregate counters for monitoring
    async fn stats(&self) -> Result<StoreStats>;

    /// Point-in-time snapshot before a destructive pass. Stores without a
    /// file representation return `None`.
    async fn backup(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

pub(crate) fn compute_stats(contacts: &[Contact]) -> StoreStats {
    use crate::contact::{ReplyState, SendState};
    let mut stats = StoreStats {
        total: contacts.len() as u64,
        ..StoreStats::default()
    };
    for c in contacts {
        match c.send_state {
            SendState::Sent => stats.sent += 1,
            SendState::SendError => stats.errors += 1,
            SendState::NotSent => stats.pending += 1,
        }
        match c.reply_state {
            ReplyState::Yes => stats.replied_yes += 1,
            ReplyState::No => stats.replied_no += 1,
            ReplyState::NoReply => {}
        }
    }
    stats
}
