//! Provider error types

use std::time::Duration;

use thiserror::Error;

/// Errors from profile and resource fetches
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode record: {0}")]
    Decode(String),
}

impl FetchError {
    /// Check if a later attempt could plausibly succeed
    ///
    /// The coordinator never retries on its own; this only decides how loudly
    /// a failure is logged.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Timeout(_) => true,
            FetchError::Backend { status, .. } => *status >= 500,
            FetchError::Decode(_) => false,
        }
    }
}

/// Errors from the identity provider itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Identity channel closed")]
    Closed,
}
