//! Contact monitoring endpoints

use axum::{extract::Extension, http::StatusCode, routing::get, Json, Router};
use rollcall_core::{Contact, ContactStore, StoreStats};
use serde::Serialize;
use std::sync::Arc;

use super::ApiResponse;

/// A contact awaiting its confirmation message
#[derive(Debug, Serialize)]
pub struct PendingContact {
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohort_id: Option<String>,
    pub send_state: String,
}

impl From<&Contact> for PendingContact {
    fn from(c: &Contact) -> Self {
        Self {
            phone: c.phone.clone(),
            display_name: c.display_name.clone(),
            cohort_id: c.cohort_id.clone(),
            send_state: c.send_state.as_str().to_string(),
        }
    }
}

/// Aggregate counters over the store
async fn contact_stats(
    Extension(store): Extension<Arc<dyn ContactStore>>,
) -> (StatusCode, Json<ApiResponse<StoreStats>>) {
    match store.stats().await {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::success(stats))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

/// Contacts eligible for the next batch pass, in store order
async fn pending_contacts(
    Extension(store): Extension<Arc<dyn ContactStore>>,
) -> (StatusCode, Json<ApiResponse<Vec<PendingContact>>>) {
    match store.load().await {
        Ok(roster) => {
            let pending: Vec<PendingContact> = roster
                .iter()
                .filter(|c| c.is_eligible())
                .map(PendingContact::from)
                .collect();
            (StatusCode::OK, Json(ApiResponse::success(pending)))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

/// Create contact routes
pub fn contacts_routes() -> Router {
    Router::new()
        .route("/api/v1/contacts/stats", get(contact_stats))
        .route("/api/v1/contacts/pending", get(pending_contacts))
}
