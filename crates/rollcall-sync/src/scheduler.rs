//! Sync scheduler - periodic import and write-back
//!
//! One `run_once` pass: fetch metadata, download, normalize, merge into the
//! store per contact, then push tracking state back to the source document.
//! The periodic loop is a plain tokio task; a failed pass is logged and the
//! next tick retries.

use std::sync::Arc;
use std::time::Duration;

use rollcall_core::store::flatfile::{contacts_from_table, contacts_to_table};
use rollcall_core::ContactStore;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::drive::{DriveClient, SourceKind};
use crate::error::{Result, SyncError};
use crate::roster::parse_roster;

/// A Drive document to sync against
#[derive(Debug, Clone)]
pub struct SyncTarget {
    /// Drive file id
    pub file_id: String,
    /// OAuth access token
    pub access_token: String,
    /// Whether to push tracking state back to the document after importing
    pub write_back: bool,
}

/// Summary of one completed sync pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Source document name
    pub file_name: String,
    /// Contacts merged into the store this pass
    pub imported: usize,
    /// Store size after the merge
    pub total: usize,
    /// Whether tracking state was written back to the source
    pub wrote_back: bool,
}

/// Runs roster sync passes against one Drive document
#[derive(Clone)]
pub struct SyncScheduler {
    drive: DriveClient,
    store: Arc<dyn ContactStore>,
    target: SyncTarget,
}

impl SyncScheduler {
    /// Create a scheduler for a target document
    pub fn new(store: Arc<dyn ContactStore>, target: SyncTarget) -> Self {
        Self {
            drive: DriveClient::new(),
            store,
            target,
        }
    }

    /// Run one import pass and, when enabled, write tracking state back
    pub async fn run_once(&self) -> Result<SyncReport> {
        let metadata = self
            .drive
            .file_metadata(&self.target.file_id, &self.target.access_token)
            .await?;
        let kind = metadata.kind().ok_or_else(|| {
            SyncError::Unsupported(format!("unsupported mime type: {}", metadata.mime_type))
        })?;

        let content = self
            .drive
            .download(&self.target.file_id, &self.target.access_token, kind)
            .await?;
        let table = parse_roster(&content)?;
        let contacts = contacts_from_table(&table)?;

        let mut imported = 0;
        for contact in contacts {
            if contact.phone.is_empty() {
                warn!("skipping roster row with empty phone");
                continue;
            }
            self.store.upsert(contact).await?;
            imported += 1;
        }

        let roster = self.store.load().await?;
        let total = roster.len();

        let wrote_back = if self.target.write_back {
            let table = contacts_to_table(&roster);
            match kind {
                SourceKind::Sheet => {
                    self.drive
                        .update_sheet(&self.target.file_id, &self.target.access_token, &table)
                        .await?;
                }
                SourceKind::Csv => {
                    self.drive
                        .update_csv(
                            &self.target.file_id,
                            &self.target.access_token,
                            &table.render(),
                        )
                        .await?;
                }
                SourceKind::Xlsx => unreachable!("xlsx rejected before download"),
            }
            true
        } else {
            false
        };

        info!(
            file = %metadata.name,
            imported,
            total,
            wrote_back,
            "roster sync pass complete"
        );

        Ok(SyncReport {
            file_name: metadata.name,
            imported,
            total,
            wrote_back,
        })
    }

    /// Spawn the periodic sync loop
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    error!(error = %e, "roster sync pass failed");
                }
            }
        })
    }
}
