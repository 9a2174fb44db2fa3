//! `seqfeed` command-line client.
//!
//! Fetches every record from the feed server, recovers gaps, and writes the
//! gap-free dataset as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use seqfeed_client::FetchBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Gap-recovering market-data fetch client.
#[derive(Parser, Debug)]
#[command(name = "seqfeed")]
#[command(about = "Fetch a sequenced record feed and recover missing records", long_about = None)]
struct Cli {
    /// Server host name or address.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Output JSON file.
    #[arg(short, long, default_value = "stockData.json")]
    output: PathBuf,

    /// Connect timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    connect_timeout_ms: u64,

    /// Idle read timeout in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    idle_timeout_ms: u64,

    /// Recovery rounds allowed after the bulk fetch.
    #[arg(long, default_value_t = 3)]
    max_recovery_rounds: u32,

    /// Connect attempts per round.
    #[arg(long, default_value_t = 5)]
    max_connect_attempts: usize,

    /// Log filter (e.g. "info,seqfeed_client=debug"); overrides RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<()> {
    let server_addr = tokio::net::lookup_host((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("failed to resolve {}:{}", cli.host, cli.port))?
        .next()
        .with_context(|| format!("no address for {}:{}", cli.host, cli.port))?;

    let report = FetchBuilder::new(server_addr)
        .connect_timeout(Duration::from_millis(cli.connect_timeout_ms))
        .idle_timeout(Duration::from_millis(cli.idle_timeout_ms))
        .max_recovery_rounds(cli.max_recovery_rounds)
        .max_connect_attempts(cli.max_connect_attempts)
        .output(&cli.output)
        .build()
        .run()
        .await
        .context("fetch failed")?;

    tracing::info!(
        records = report.records.len(),
        recovered = report.recovered,
        rounds = report.rounds,
        "Fetch complete, written to {}",
        report.sink
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
