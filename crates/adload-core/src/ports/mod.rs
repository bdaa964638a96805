//! Port definitions for adload.
//!
//! Ports are the contracts the load pipeline consumes (the connection) and
//! produces (the delegate). Implementations live outside the core: the
//! HTTP adapter implements `ServerConnectionPort`, callers implement
//! `AdLoadManagerDelegate`.

mod connection;
mod delegate;

pub use connection::{ConnectionError, ServerConnectionPort};
pub use delegate::AdLoadManagerDelegate;
