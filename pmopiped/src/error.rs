//! Error types for the Piped resolver and relay

use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;

/// Result type alias for Piped operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the Piped client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client construction or request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Every instance of the registry failed for this video
    #[error("No audio stream found for {video_id} ({} instance(s) tried)", .attempts.len())]
    Exhausted {
        video_id: String,
        attempts: Vec<InstanceFailure>,
    },

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

    /// True when resolution ran through the whole instance list
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Why a single instance could not serve a video
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("no audio streams")]
    NoAudioStreams,

    #[error("invalid instance URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// One failed attempt, kept for the exhausted outcome
#[derive(Debug)]
pub struct InstanceFailure {
    pub instance: String,
    pub error: InstanceError,
}

impl fmt::Display for InstanceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.instance, self.error)
    }
}
