//! Contact - roster records with send/reply tracking
//!
//! One `Contact` per (phone, cohort). The phone is stored digits-only; the
//! optional cohort id distinguishes the same person enrolled in several
//! campaigns. Roster columns that are not part of the fixed schema ride along
//! in `attributes` and can be used as ordered template parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A recorded yes/no answer. Terminal once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// The contact confirmed
    Yes,
    /// The contact declined
    No,
}

impl Decision {
    /// Stable string form used in stores and API responses
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tri-state consent flag. Contacts without explicit consent are never
/// eligible for outbound sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptIn {
    /// Explicit consent
    Yes,
    /// Explicit refusal
    No,
    /// No consent information in the roster
    #[default]
    Unknown,
}

impl OptIn {
    /// Parse the roster cell forms the original sheets use
    /// (`TRUE`, `1`, `YES`, `SI`, `SÍ` and their negatives).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match crate::text::normalize_token(raw).as_str() {
            "true" | "1" | "yes" | "si" | "y" => Self::Yes,
            "false" | "0" | "no" | "n" => Self::No,
            _ => Self::Unknown,
        }
    }

    /// Stable string form for the flat file (`Unknown` round-trips as empty)
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "true",
            Self::No => "false",
            Self::Unknown => "",
        }
    }
}

/// Outbound delivery state of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendState {
    /// No send attempted yet
    #[default]
    NotSent,
    /// Provider accepted the message
    Sent,
    /// The send attempt failed
    SendError,
}

impl SendState {
    /// Parse the flat-file cell (empty means not sent)
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "sent" => Self::Sent,
            "error" => Self::SendError,
            _ => Self::NotSent,
        }
    }

    /// Stable string form for stores
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSent => "",
            Self::Sent => "sent",
            Self::SendError => "error",
        }
    }
}

/// Inbound reply state of a contact. `Yes`/`No` are terminal: later inbound
/// events must never overwrite them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyState {
    /// No answer recorded
    #[default]
    NoReply,
    /// Confirmed
    Yes,
    /// Declined
    No,
}

impl ReplyState {
    /// Parse the flat-file cell (empty means no reply)
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match crate::text::normalize_token(raw).as_str() {
            "yes" | "si" => Self::Yes,
            "no" => Self::No,
            _ => Self::NoReply,
        }
    }

    /// Stable string form for stores
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoReply => "",
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// The recorded decision, if any
    #[must_use]
    pub fn decision(&self) -> Option<Decision> {
        match self {
            Self::Yes => Some(Decision::Yes),
            Self::No => Some(Decision::No),
            Self::NoReply => None,
        }
    }
}

impl From<Decision> for ReplyState {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Yes => Self::Yes,
            Decision::No => Self::No,
        }
    }
}

/// One roster row: a person reachable over WhatsApp plus their tracking state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Canonical phone, digits only (no `+`, spaces, hyphens or parens)
    pub phone: String,
    /// Campaign/cohort identifier; with `phone` it forms the uniqueness key
    pub cohort_id: Option<String>,
    /// Human-readable cohort name
    pub cohort_name: Option<String>,
    /// Display name, non-authoritative
    pub display_name: Option<String>,
    /// Consent flag
    pub opt_in: OptIn,
    /// Outbound delivery state
    pub send_state: SendState,
    /// When the last send attempt happened
    pub send_timestamp: Option<DateTime<Utc>>,
    /// Provider message id of the successful send
    pub provider_message_id: Option<String>,
    /// Recorded answer state
    pub reply_state: ReplyState,
    /// When the answer was recorded
    pub reply_timestamp: Option<DateTime<Utc>>,
    /// Button id / payload / echoed text of the recorded answer
    pub reply_correlation_id: Option<String>,
    /// Passthrough roster columns (template parameters, audit fields)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Contact {
    /// Create a contact with a normalized phone and empty tracking state
    #[must_use]
    pub fn new(phone: impl AsRef<str>) -> Self {
        Self {
            phone: normalize_phone(phone.as_ref()),
            cohort_id: None,
            cohort_name: None,
            display_name: None,
            opt_in: OptIn::Unknown,
            send_state: SendState::NotSent,
            send_timestamp: None,
            provider_message_id: None,
            reply_state: ReplyState::NoReply,
            reply_timestamp: None,
            reply_correlation_id: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the cohort id
    #[must_use]
    pub fn with_cohort(mut self, cohort_id: impl Into<String>) -> Self {
        self.cohort_id = Some(cohort_id.into());
        self
    }

    /// Set the display name
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the consent flag
    #[must_use]
    pub fn with_opt_in(mut self, opt_in: OptIn) -> Self {
        self.opt_in = opt_in;
        self
    }

    /// Uniqueness key within a store: (phone, cohort)
    #[must_use]
    pub fn key(&self) -> (String, String) {
        (
            self.phone.clone(),
            self.cohort_id.clone().unwrap_or_default(),
        )
    }

    /// Eligible for an outbound send pass: consented and not yet sent.
    /// Reply state is deliberately not consulted here.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.opt_in == OptIn::Yes && self.send_state != SendState::Sent
    }

    /// Whether a terminal answer has been recorded
    #[must_use]
    pub fn has_answered(&self) -> bool {
        self.reply_state != ReplyState::NoReply
    }
}

/// Normalize a phone number for storage and comparison: strip `+`, spaces,
/// hyphens and parentheses, then trim. WhatsApp delivers `wa_id`s without the
/// leading `+`, so both sides collapse to the same digits-only form.
#[must_use]
pub fn normalize_phone(phone: &str) -> String {
    phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '-' | '(' | ')'))
        .collect()
}

/// Indices of the contacts eligible for a batch-send pass, in original store
/// order. Re-evaluated fresh on every invocation; stable ordering lets a
/// restarted pass resume deterministically after a partial failure.
#[must_use]
pub fn eligible_contacts(contacts: &[Contact]) -> Vec<usize> {
    contacts
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_eligible())
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(phone: &str, opt_in: OptIn, send_state: SendState) -> Contact {
        let mut c = Contact::new(phone);
        c.opt_in = opt_in;
        c.send_state = send_state;
        c
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+57 300 111-2233"), "573001112233");
        assert_eq!(normalize_phone("(57) 3001112233"), "573001112233");
        assert_eq!(normalize_phone("573001112233"), "573001112233");
    }

    #[test]
    fn test_opt_in_parse_variants() {
        for raw in ["TRUE", "1", "yes", "Si", "SÍ"] {
            assert_eq!(OptIn::parse(raw), OptIn::Yes, "raw = {raw:?}");
        }
        assert_eq!(OptIn::parse("FALSE"), OptIn::No);
        assert_eq!(OptIn::parse(""), OptIn::Unknown);
        assert_eq!(OptIn::parse("maybe"), OptIn::Unknown);
    }

    #[test]
    fn test_eligibility_predicate() {
        assert!(contact("1", OptIn::Yes, SendState::NotSent).is_eligible());
        assert!(contact("1", OptIn::Yes, SendState::SendError).is_eligible());
        assert!(!contact("1", OptIn::Yes, SendState::Sent).is_eligible());
        assert!(!contact("1", OptIn::No, SendState::NotSent).is_eligible());
        assert!(!contact("1", OptIn::Unknown, SendState::NotSent).is_eligible());
    }

    #[test]
    fn test_eligible_contacts_keeps_store_order() {
        let contacts = vec![
            contact("111", OptIn::Yes, SendState::NotSent),
            contact("222", OptIn::No, SendState::NotSent),
            contact("333", OptIn::Yes, SendState::NotSent),
        ];
        assert_eq!(eligible_contacts(&contacts), vec![0, 2]);
    }

    #[test]
    fn test_eligible_set_empty_after_send_pass() {
        let mut contacts = vec![
            contact("111", OptIn::Yes, SendState::NotSent),
            contact("333", OptIn::Yes, SendState::NotSent),
        ];
        for idx in eligible_contacts(&contacts) {
            contacts[idx].send_state = SendState::Sent;
        }
        assert!(eligible_contacts(&contacts).is_empty());
    }

    #[test]
    fn test_reply_state_parse_round_trip() {
        assert_eq!(ReplyState::parse("yes"), ReplyState::Yes);
        assert_eq!(ReplyState::parse("Sí"), ReplyState::Yes);
        assert_eq!(ReplyState::parse("no"), ReplyState::No);
        assert_eq!(ReplyState::parse(""), ReplyState::NoReply);
        assert_eq!(ReplyState::parse(ReplyState::Yes.as_str()), ReplyState::Yes);
    }
}
