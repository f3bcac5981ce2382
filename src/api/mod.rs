//! Web API module for Rollcall
//!
//! Endpoints:
//! - Health check
//! - WhatsApp webhook (verification + inbound messages)
//! - Single and batch message sends
//! - Contact stats and pending list
//! - Drive roster import

pub mod contacts;
pub mod health;
pub mod messages;
pub mod sync;
pub mod webhook;

use axum::Router;
use serde::Serialize;

pub use contacts::contacts_routes;
pub use health::health_routes;
pub use messages::messages_routes;
pub use sync::sync_routes;
pub use webhook::webhook_routes;

/// Standard API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(health_routes())
        .merge(webhook_routes())
        .merge(messages_routes())
        .merge(contacts_routes())
        .merge(sync_routes())
}
