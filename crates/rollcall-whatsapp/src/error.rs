//! Error types for rollcall-whatsapp

use thiserror::Error;

/// Outbound send error type
#[derive(Debug, Error)]
pub enum SendError {
    /// The Cloud API returned an error object
    #[error("api error {code}: {message}")]
    Api {
        /// Provider error code
        code: i64,
        /// Provider error message
        message: String,
    },

    /// The request timed out
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a body we could not interpret
    #[error("invalid api response: {0}")]
    InvalidResponse(String),

    /// Credentials are missing or incomplete
    #[error("credentials error: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SendError::Timeout
        } else if err.is_decode() {
            SendError::InvalidResponse(err.to_string())
        } else {
            SendError::Network(err.to_string())
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SendError>;
