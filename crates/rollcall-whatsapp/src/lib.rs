//! Rollcall WhatsApp - WhatsApp Business Cloud API adapter
//!
//! Outbound template and text sends through the official Cloud API, webhook
//! payload parsing into domain events, and the acknowledgment texts sent back
//! to contacts after a reply.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ack;
pub mod client;
pub mod config;
pub mod error;
pub mod webhook;

pub use client::WhatsAppClient;
pub use config::WhatsAppConfig;
pub use error::{Result, SendError};
pub use webhook::{extract_events, WebhookEnvelope};
