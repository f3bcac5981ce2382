//! Health check endpoint

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use rollcall_core::ContactStore;
use rollcall_whatsapp::WhatsAppClient;
use serde::Serialize;
use std::sync::Arc;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub whatsapp: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<u64>,
}

/// Health check: always answers, reports unconfigured credentials so a
/// misconfigured deployment is visible before the first send fails
async fn health_check(
    Extension(store): Extension<Arc<dyn ContactStore>>,
    Extension(whatsapp): Extension<Arc<WhatsAppClient>>,
) -> Json<HealthResponse> {
    let whatsapp_status = if whatsapp.config().is_configured() {
        "configured"
    } else {
        "unconfigured"
    };
    let contacts = store.stats().await.ok().map(|s| s.total);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        whatsapp: whatsapp_status,
        contacts,
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            whatsapp: "unconfigured",
            contacts: Some(3),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("unconfigured"));
    }
}
