//! Upstream client errors.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, timeout or body transfer failure.
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("upstream returned {0}")]
    Status(StatusCode),

    /// The upstream answered 2xx but the body was not what we expected.
    #[error("unexpected upstream response: {0}")]
    Decode(String),

    /// An endpoint path could not be joined onto the base URL.
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),

    /// A relayed path tried to leave the upstream base path.
    #[error("refusing upstream path '{0}'")]
    InvalidPath(String),
}

impl UpstreamError {
    /// True when the upstream was reached and said no.
    pub fn is_rejection(&self) -> bool {
        matches!(self, UpstreamError::Status(status) if status.is_client_error())
    }
}
