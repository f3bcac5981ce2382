//! Server startup
//!
//! Builds the contact store, WhatsApp client and reconciler, spawns the
//! optional roster sync loop, and serves the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Extension;
use rollcall_core::{ContactStore, FlatFileStore, Reconciler, SqliteStore};
use rollcall_sync::{SyncScheduler, SyncTarget};
use rollcall_whatsapp::{WhatsAppClient, WhatsAppConfig};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::config::{AppConfig, StoreBackend};

/// Build the configured contact store
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn ContactStore>> {
    let store: Arc<dyn ContactStore> = match config.store.backend {
        StoreBackend::Flatfile => {
            info!(path = %config.store.path, "using flat-file contact store");
            Arc::new(FlatFileStore::new(&config.store.path))
        }
        StoreBackend::Sqlite => {
            info!(path = %config.store.path, "using sqlite contact store");
            Arc::new(
                SqliteStore::from_path(std::path::Path::new(&config.store.path))
                    .await
                    .context("Failed to open sqlite store")?,
            )
        }
    };
    Ok(store)
}

/// Assemble the router with all extensions applied
pub fn build_app(
    config: Arc<AppConfig>,
    store: Arc<dyn ContactStore>,
    whatsapp: Arc<WhatsAppClient>,
) -> axum::Router {
    let reconciler = Reconciler::new(store.clone());

    crate::api::api_router()
        .layer(TraceLayer::new_for_http())
        .layer(Extension(config))
        .layer(Extension(store))
        .layer(Extension(whatsapp))
        .layer(Extension(reconciler))
        .layer(CorsLayer::permissive())
}

/// Run the server until shutdown
pub async fn run(config: AppConfig) -> Result<()> {
    let store = build_store(&config).await?;

    let wa_config = WhatsAppConfig::from_env();
    if !wa_config.is_configured() {
        warn!("WhatsApp credentials not configured; outbound sends will fail");
    }
    let whatsapp = Arc::new(WhatsAppClient::new(wa_config)?);

    if config.sync.enabled {
        match std::env::var("GOOGLE_ACCESS_TOKEN") {
            Ok(token) if !config.sync.file_id.is_empty() => {
                let scheduler = SyncScheduler::new(
                    store.clone(),
                    SyncTarget {
                        file_id: config.sync.file_id.clone(),
                        access_token: token,
                        write_back: config.sync.write_back,
                    },
                );
                info!(
                    file_id = %config.sync.file_id,
                    interval_secs = config.sync.interval_secs,
                    "starting roster sync loop"
                );
                scheduler.spawn(Duration::from_secs(config.sync.interval_secs));
            }
            _ => warn!(
                "sync enabled but GOOGLE_ACCESS_TOKEN or sync.file_id missing; sync loop not started"
            ),
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = build_app(Arc::new(config), store, whatsapp);

    info!("HTTP server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Rollcall shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
