//! Rollcall Sync - roster import from Google Drive
//!
//! Downloads a roster (Google Sheet or CSV file on Drive), normalizes its
//! columns into the contact schema, merges it into the contact store, and
//! optionally writes tracking state back to the source document.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod drive;
pub mod error;
pub mod roster;
pub mod scheduler;

pub use drive::{DriveClient, FileMetadata, SourceKind};
pub use error::{Result, SyncError};
pub use roster::normalize_roster;
pub use scheduler::{SyncReport, SyncScheduler, SyncTarget};
