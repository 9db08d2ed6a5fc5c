//! Error types for the Ondu reader

use thiserror::Error;

/// Errors raised by a media element
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Platform refused to start playback (autoplay policy)
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("No source loaded")]
    NoSource,

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors raised while talking to the backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Backend answered but reported a failure in the body
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// HTTP status code if the backend answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
