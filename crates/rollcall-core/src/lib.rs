//! Rollcall Core - Domain logic
//!
//! This crate provides the domain core of the rollcall confirmation service:
//! - Contact model with send/reply tracking and the batch-send eligibility filter
//! - Reply classifier (pure normalization of inbound "Sí"/"No" answers)
//! - Reply reconciler (idempotent, terminal-state-guarded reply recording)
//! - `ContactStore` trait with flat-file and SQLite implementations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod contact;
pub mod error;
pub mod event;
pub mod reconcile;
pub mod store;
pub mod text;

pub use error::{Error, Result};

pub use classify::{classify, Classification};
pub use contact::{eligible_contacts, normalize_phone, Contact, Decision, OptIn, ReplyState, SendState};
pub use event::{InboundEvent, InboundKind};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use store::{ContactStore, ReplyWrite, SendRecord, StoreStats};
pub use store::flatfile::FlatFileStore;
pub use store::sqlite::SqliteStore;
pub use store::table::Table;
