//! Server connection port.
//!
//! The download channel used for every asset fetch. The core only relies on
//! "one URL in, bytes or an error out"; retries, timeouts and authentication
//! are the implementation's concern.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Failure reported by a connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ConnectionError {
    /// Detailed error message.
    pub message: String,
    /// HTTP status code if the failure came from a response.
    pub status_code: Option<u16>,
}

impl ConnectionError {
    /// Create an error without a status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create an error carrying an HTTP status code.
    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
        }
    }
}

/// Port for fetching creative assets.
///
/// Shared read-only by every download a factory issues, so implementations
/// must be safe to call concurrently.
#[async_trait]
pub trait ServerConnectionPort: Send + Sync {
    /// Fetch the body at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, ConnectionError>;
}
