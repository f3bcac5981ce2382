//! Error types for rollcall-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Contact store could not be read or written
    #[error("store error: {0}")]
    Store(String),

    /// A required column is missing from the roster file
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Flat table could not be parsed
    #[error("table parse error: {0}")]
    Table(String),

    /// Database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
