//! CLI entry point - the composition root.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use adload_cli::{Cli, Commands, LoadArgs, check_input, load_input, run_load};
use adload_http::{HttpConnectionConfig, ReqwestConnection};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report<T: Serialize>(
    report: &T,
    json: bool,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", text());
    }
    Ok(())
}

async fn load(args: &LoadArgs, json: bool) -> anyhow::Result<bool> {
    let input = load_input(&args.fixture)?.with_overrides(args);

    let config = HttpConnectionConfig::new()
        .with_max_retries(args.max_retries)
        .with_timeout(Duration::from_secs(args.request_timeout_secs));
    let connection = ReqwestConnection::new(&config).context("Failed to create HTTP client")?;

    let report = run_load(input, Arc::new(connection)).await?;
    print_report(&report, json, || report.render())?;
    Ok(report.is_success())
}

fn check(fixture: &std::path::Path, json: bool) -> anyhow::Result<bool> {
    let input = load_input(fixture)?;
    let report = check_input(&input);
    print_report(&report, json, || report.render())?;
    Ok(report.is_loadable())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ok = match &cli.command {
        Commands::Load(args) => load(args, cli.json).await?,
        Commands::Check { fixture } => check(fixture, cli.json)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
