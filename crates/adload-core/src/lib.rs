//! Core domain types and port definitions for adload.
//!
//! This crate holds everything the load pipeline and its adapters agree on:
//!
//! - `domain` - bids, ad configuration and creative models (pure values)
//! - `creative` - materialized creatives and the deferred download-hook
//! - `transaction` - the revocable scope binding downloads to one load attempt
//! - `ports` - the connection and delegate contracts
//! - `error` - the load error taxonomy
//!
//! Orchestration lives in `adload-loader`; transports live in adapter crates.

#![deny(unused_crate_dependencies)]

pub mod creative;
pub mod domain;
pub mod error;
pub mod ports;
pub mod transaction;

// Re-export commonly used types for convenience
pub use creative::{
    AbstractCreative, CreativeBody, DownloadHook, HtmlCreative, NativeCreative, ResolvedAsset,
    VideoCreative,
};
pub use domain::{
    AdConfiguration, AdFormat, AdSize, Bid, CreativeKind, CreativeModel, NativeAsset,
    TrackingEvent,
};
pub use error::{AdLoadError, AdLoadResult};
pub use ports::{AdLoadManagerDelegate, ConnectionError, ServerConnectionPort};
pub use transaction::{Transaction, TransactionHandle, TransactionId};

// Only exercised by async unit tests
#[cfg(test)]
use tokio_test as _;
