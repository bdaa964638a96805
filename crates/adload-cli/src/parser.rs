//! Command-line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Load ad creatives described by a bid fixture.
#[derive(Debug, Parser)]
#[command(name = "adload")]
#[command(about = "Resolve a bid into loadable ad creatives")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one load attempt against the network
    Load(LoadArgs),
    /// Validate a fixture's creative models without downloading anything
    Check {
        /// Fixture file ({ "bid", "ad_configuration", "creatives" })
        fixture: PathBuf,
    },
}

/// Options for `adload load`.
#[derive(Debug, Clone, clap::Args)]
pub struct LoadArgs {
    /// Fixture file ({ "bid", "ad_configuration", "creatives" })
    pub fixture: PathBuf,

    /// Fail the load if creatives are not ready in time (overrides the fixture)
    #[arg(long, env = "ADLOAD_LOAD_TIMEOUT_MS")]
    pub load_timeout_ms: Option<u64>,

    /// Maximum concurrent asset downloads (overrides the fixture)
    #[arg(long, env = "ADLOAD_MAX_CONCURRENT_DOWNLOADS")]
    pub max_concurrent_downloads: Option<u32>,

    /// Retries for transient HTTP failures
    #[arg(long, env = "ADLOAD_HTTP_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u8,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "ADLOAD_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}
