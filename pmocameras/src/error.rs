//! Error types for the camera poller

/// Result type alias for camera operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching configuration or camera images
///
/// None of these ever reach the caller of [`PollerManager::start`](crate::PollerManager::start):
/// the poller swallows them and records them in its diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("{url} answered HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Operation interrupted by the cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error (from pmoconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error comes from cancellation rather than a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
