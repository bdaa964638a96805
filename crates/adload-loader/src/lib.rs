//! Load pipeline for adload.
//!
//! - `factory` - builds one creative per model, performing eager downloads,
//!   and reports the set exactly once
//! - `manager` - owns a load attempt and forwards its terminal result to a
//!   delegate
//!
//! Both require a tokio runtime once a load attempt starts.

#![deny(unused_crate_dependencies)]

pub mod factory;
pub mod manager;

pub use factory::{
    CreativeAccumulator, CreativeFactory, FactoryConfig, FactoryHandle, FactoryResult,
    FinishedCallback,
};
pub use manager::AdLoadManager;

// Only exercised by async unit tests
#[cfg(test)]
use tokio_test as _;
