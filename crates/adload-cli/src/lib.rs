//! Command-line front end for adload.
//!
//! The binary is the composition root: it wires `AdLoadManager` to the
//! reqwest connection and prints what a load attempt produced.

#![deny(unused_crate_dependencies)]

// Used by the binary only
use adload_http as _;
use tracing_subscriber as _;

pub mod fixture;
pub mod parser;
pub mod runner;

pub use fixture::{LoadInput, load_input};
pub use parser::{Cli, Commands, LoadArgs};
pub use runner::{CheckReport, LoadReport, check_input, run_load};
