pub mod config;
pub mod error;
pub mod searcher;
pub mod snapshot;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use arb_loop_core::BellmanFordSolver;
use error::Error;
use searcher::ArbSearcher;
use snapshot::SnapshotReader;

/// Scans a market snapshot for profitable trading loops.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config (defaults to crates/executor/Config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Snapshot CSV to scan, overrides snapshot.path
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Asset to start from, overrides search.source
    #[arg(long)]
    source: Option<String>,

    /// Use the depth-aware finder and report volume limits
    #[arg(long)]
    depth: bool,
}

fn main() -> ExitCode {
    init_tracing();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Scan failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}

fn run(args: Args) -> Result<(), Error> {
    let mut config = config::load_config(args.config.as_deref())?;

    // CLI flags take priority over the config file.
    if let Some(path) = args.snapshot {
        config.snapshot.path = path;
    }
    if let Some(source) = args.source {
        config.search.source = source;
    }
    if args.depth {
        config.search.depth = true;
    }

    let reader = SnapshotReader::new(config.snapshot.path.clone(), config.snapshot.name.clone());
    let graph = reader.load_graph()?;

    let searcher = ArbSearcher::new(BellmanFordSolver::new(config.search.mode()), config.search);
    let opportunities = searcher.search(&graph)?;

    for opportunity in &opportunities {
        println!("{}", opportunity);
    }
    info!(found = opportunities.len(), "Scan complete");

    Ok(())
}
