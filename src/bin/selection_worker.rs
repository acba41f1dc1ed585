//! selection-worker - stdio host for the selection router
//!
//! Usage:
//!   selection_worker [--log-level <filter>]
//!
//! Reads one JSON request per line from stdin and writes one JSON response
//! per line to stdout. Logs go to stderr.

use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use hilbert_select::Router;

#[derive(Debug, Parser)]
#[command(name = "selection_worker")]
#[command(about = "Serve box, lasso and nearest-point selections over stdio", long_about = None)]
struct Cli {
    /// Log filter, e.g. "debug" or "hilbert_select=trace" (overrides RUST_LOG)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = cli.log_level.as_deref() {
        logger.parse_filters(filter);
    }
    logger
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let mut router = Router::new();
    router
        .run(stdin, stdout)
        .context("selection worker stopped")?;

    log::info!("input closed, shutting down");
    Ok(())
}
