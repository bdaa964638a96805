//! Load error types.
//!
//! These errors are designed to be serializable and not depend on transport
//! error types like `reqwest::Error`. Transport failures are captured as a
//! message and optional HTTP status at the port boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::ConnectionError;

/// Error type for a load attempt.
///
/// Every variant is terminal for the attempt that produced it. Nothing in
/// the core retries; a caller wanting another try starts a new manager.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AdLoadError {
    /// Transport/HTTP failure while fetching an asset.
    #[error("Connection error for {url}: {message}")]
    Connection {
        /// The URL that was being fetched.
        url: String,
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        /// Position of the creative model that issued the fetch.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_index: Option<usize>,
    },

    /// The factory cannot construct this kind of creative.
    #[error("Unsupported creative kind '{kind}' (model {model_index})")]
    UnsupportedCreativeKind {
        /// Position of the offending model.
        model_index: usize,
        /// The kind as reported by the model.
        kind: String,
    },

    /// The model is missing data its kind requires.
    #[error("Malformed creative model {model_index}: {reason}")]
    MalformedCreative {
        /// Position of the offending model.
        model_index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// No creative models were supplied.
    #[error("No creative models to construct")]
    EmptyCreativeSet,

    /// The transaction was revoked before the attempt completed naturally.
    #[error("Load attempt cancelled")]
    Cancelled,

    /// The load timer fired before the creatives were ready.
    #[error("Load timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// A download-hook was asked for the same URL twice in one render attempt.
    #[error("Asset already requested: {url}")]
    DuplicateDownload {
        /// The repeated URL.
        url: String,
    },

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl AdLoadError {
    /// Create a connection error from a port failure.
    pub fn connection(
        url: impl Into<String>,
        model_index: Option<usize>,
        source: &ConnectionError,
    ) -> Self {
        Self::Connection {
            url: url.into(),
            message: source.message.clone(),
            status_code: source.status_code,
            model_index,
        }
    }

    /// Create an unsupported kind error.
    pub fn unsupported_kind(model_index: usize, kind: impl Into<String>) -> Self {
        Self::UnsupportedCreativeKind {
            model_index,
            kind: kind.into(),
        }
    }

    /// Create a malformed model error.
    pub fn malformed(model_index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedCreative {
            model_index,
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub const fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create a duplicate download error.
    pub fn duplicate_download(url: impl Into<String>) -> Self {
        Self::DuplicateDownload { url: url.into() }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The creative model this error is attributed to, if any.
    #[must_use]
    pub const fn model_index(&self) -> Option<usize> {
        match self {
            Self::Connection { model_index, .. } => *model_index,
            Self::UnsupportedCreativeKind { model_index, .. }
            | Self::MalformedCreative { model_index, .. } => Some(*model_index),
            _ => None,
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection {
                url,
                status_code: Some(code),
                ..
            } => format!("Could not download {url} (HTTP {code})."),
            Self::Connection { url, message, .. } => {
                format!("Could not download {url}: {message}")
            }
            Self::UnsupportedCreativeKind { kind, .. } => {
                format!("Creatives of kind '{kind}' cannot be displayed.")
            }
            Self::MalformedCreative { reason, .. } => format!("Invalid creative: {reason}"),
            Self::EmptyCreativeSet => "The bid did not contain any creatives.".to_string(),
            Self::Cancelled => "The ad load was cancelled.".to_string(),
            Self::Timeout { timeout_ms } => {
                format!("The ad did not load within {timeout_ms} ms.")
            }
            Self::DuplicateDownload { url } => format!("Asset {url} was already requested."),
            Self::Other { message } => message.clone(),
        }
    }
}

/// Convenience result type for load operations.
pub type AdLoadResult<T> = Result<T, AdLoadError>;
