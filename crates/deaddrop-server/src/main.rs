//! Deaddrop relay admin binary.
//!
//! # Usage
//!
//! ```bash
//! # Pool and object counts
//! deaddrop-server --db deaddrop.redb stats
//!
//! # Write all objects created after a unix time into a bundle directory
//! deaddrop-server --db deaddrop.redb export --since 1754000000 --out ./bundle
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deaddrop_server::{RedbStorage, RetrievalError, RetrievalService, Storage};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Deaddrop relay administration
#[derive(Parser, Debug)]
#[command(name = "deaddrop-server")]
#[command(about = "Deaddrop relay key-pool and object administration")]
#[command(version)]
struct Args {
    /// Path to the ledger database
    #[arg(long, default_value = "deaddrop.redb")]
    db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report key-pool and object counts
    Stats,

    /// Export all objects created after a given time as a bundle directory
    Export {
        /// Unix seconds; strictly newer objects are exported
        #[arg(long, default_value_t = 0)]
        since: u64,

        /// Output directory for the bundle
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let storage = RedbStorage::open(&args.db)?;

    match args.command {
        Command::Stats => {
            tracing::info!(
                available_keys = storage.available_key_count()?,
                consumed_keys = storage.consumed_key_count()?,
                objects = storage.object_count()?,
                "ledger stats"
            );
        },
        Command::Export { since, out } => {
            let retrieval = RetrievalService::new(storage);
            match retrieval.export_to_dir(since, &out) {
                Ok(count) => {
                    tracing::info!(count, out = %out.display(), "bundle exported");
                },
                Err(RetrievalError::NoNewObjects) => {
                    tracing::info!(since, "no new objects since the requested time");
                },
                Err(err) => return Err(err.into()),
            }
        },
    }

    Ok(())
}
