//! HTTP download channel for adload.
//!
//! `ReqwestConnection` implements `ServerConnectionPort` over reqwest, with
//! automatic retry for transient failures. Errors internal to this crate are
//! mapped to `ConnectionError` at the port boundary.

#![deny(unused_crate_dependencies)]

mod config;
mod connection;
mod error;

// ============================================================================
// Public API
// ============================================================================

pub use config::HttpConnectionConfig;
pub use connection::ReqwestConnection;
pub use error::{HttpError, HttpResult};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
