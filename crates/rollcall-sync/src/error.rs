//! Error types for rollcall-sync

use thiserror::Error;

/// Roster sync error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// Drive or Sheets API rejected the request
    #[error("drive api error {status}: {message}")]
    Drive {
        /// HTTP status code
        status: u16,
        /// Human-readable context
        message: String,
    },

    /// The source document format cannot be synced
    #[error("unsupported source: {0}")]
    Unsupported(String),

    /// The roster content could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// No recognizable phone column in the roster
    #[error("roster has no phone column")]
    MissingPhoneColumn,

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out
    #[error("request timed out")]
    Timeout,

    /// Store-side failure during import
    #[error(transparent)]
    Core(#[from] rollcall_core::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SyncError>;
