//! On-demand Drive roster import

use axum::{extract::Extension, http::StatusCode, routing::post, Json, Router};
use rollcall_core::ContactStore;
use rollcall_sync::{SyncError, SyncReport, SyncScheduler, SyncTarget};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::ApiResponse;
use crate::server::config::AppConfig;

/// Import request; camelCase aliases match the web client
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(alias = "fileId")]
    pub file_id: String,
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "writeBack")]
    pub write_back: Option<bool>,
}

/// Run one import pass against a Drive document
async fn import_roster(
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(store): Extension<Arc<dyn ContactStore>>,
    Json(req): Json<ImportRequest>,
) -> (StatusCode, Json<ApiResponse<SyncReport>>) {
    if req.file_id.is_empty() || req.access_token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("fileId and accessToken are required")),
        );
    }

    let scheduler = SyncScheduler::new(
        store,
        SyncTarget {
            file_id: req.file_id,
            access_token: req.access_token,
            write_back: req.write_back.unwrap_or(config.sync.write_back),
        },
    );

    match scheduler.run_once().await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report))),
        Err(e) => {
            error!(error = %e, "roster import failed");
            let status = match &e {
                SyncError::Drive { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                SyncError::Unsupported(_)
                | SyncError::MissingPhoneColumn
                | SyncError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SyncError::Timeout | SyncError::Network(_) => StatusCode::BAD_GATEWAY,
                SyncError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Create sync routes
pub fn sync_routes() -> Router {
    Router::new().route("/api/v1/sync/import", post(import_roster))
}
