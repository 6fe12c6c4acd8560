//! CRM spreadsheet ingestor binary.
//!
//! Loads configuration, initializes tracing, and runs the incremental
//! ingestion pipeline for the selected sheet domains. Designed to be invoked
//! by a scheduler; one invocation is one batch run.

use clap::{Parser, ValueEnum};
use crmsync::types::Domain;

use crate::config::load_ingestor_config;
use crate::core::run_ingestor_with_config;
use crate::error::{IngestorError, IngestorResult};

use crmsync_telemetry::tracing::init_tracing;

mod config;
mod core;
mod error;

/// Which sheet tabs one invocation processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DomainArg {
    /// Only the leads tab.
    Leads,
    /// Only the daily trading volume tab.
    TradingVolume,
    /// Both tabs, leads first.
    All,
}

impl DomainArg {
    fn domains(&self) -> Vec<Domain> {
        match self {
            DomainArg::Leads => vec![Domain::Leads],
            DomainArg::TradingVolume => vec![Domain::TradingVolume],
            DomainArg::All => vec![Domain::Leads, Domain::TradingVolume],
        }
    }
}

/// Ingests spreadsheet rows into the CRM warehouse.
#[derive(Debug, Parser)]
#[command(name = "crmsync-ingestor")]
#[command(about = "Ingests new lead and trading volume rows from the team spreadsheet")]
struct Args {
    /// Domain to ingest in this invocation.
    #[arg(value_enum, default_value = "all")]
    domain: DomainArg,
}

/// Entry point for the ingestor binary.
///
/// Failures are rendered as a readable report on stderr and turned into a
/// non-zero exit code, which is what the scheduler keys alerts on.
fn main() {
    if let Err(error) = run() {
        eprintln!("{}", error.render_report());
        std::process::exit(1);
    }
}

fn run() -> IngestorResult<()> {
    let args = Args::parse();

    // Load ingestor config
    let ingestor_config = load_ingestor_config()?;

    // Initialize tracing
    init_tracing(env!("CARGO_BIN_NAME")).map_err(IngestorError::config)?;

    // We start the runtime.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_ingestor_with_config(
            ingestor_config,
            args.domain.domains(),
        ))?;

    Ok(())
}
