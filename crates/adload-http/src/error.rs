//! Internal error types for HTTP fetches.
//!
//! These errors stay inside `adload-http` and are mapped to
//! `ConnectionError` at the port boundary.

use adload_core::ConnectionError;
use thiserror::Error;

/// Result type alias for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors raised while fetching an asset.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Only http and https URLs can be fetched.
    #[error("Unsupported URL scheme '{scheme}'")]
    UnsupportedScheme {
        /// The rejected scheme
        scheme: String,
    },
}

impl HttpError {
    /// HTTP status code, if the failure came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl(_) | Self::UnsupportedScheme { .. } => None,
        }
    }
}

impl From<HttpError> for ConnectionError {
    fn from(error: HttpError) -> Self {
        let message = error.to_string();
        match error.status_code() {
            Some(status) => Self::with_status(message, status),
            None => Self::new(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let error = HttpError::Status {
            status: 404,
            url: "https://cdn.example/missing.png".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("cdn.example"));
    }

    #[test]
    fn test_status_maps_to_connection_error() {
        let error = HttpError::Status {
            status: 503,
            url: "https://cdn.example/a.js".to_string(),
        };
        let mapped = ConnectionError::from(error);
        assert_eq!(mapped.status_code, Some(503));
        assert!(mapped.message.contains("503"));
    }

    #[test]
    fn test_invalid_url_has_no_status() {
        let error: HttpError = url::Url::parse("not a url").unwrap_err().into();
        let mapped = ConnectionError::from(error);
        assert_eq!(mapped.status_code, None);
        assert!(mapped.message.contains("Invalid URL"));
    }
}
