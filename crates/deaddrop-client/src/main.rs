//! Deaddrop recipient binary.
//!
//! # Usage
//!
//! ```bash
//! # Generate 20 key pairs offline into the vault
//! deaddrop-recipient --vault vault.redb generate --count 20
//!
//! # Write the un-uploaded public halves out as PEM files
//! deaddrop-recipient --vault vault.redb export --out ./to-upload
//!
//! # Decrypt a fetched bundle directory
//! deaddrop-recipient --vault vault.redb decrypt --input ./downloads --output ./decrypted
//! ```

use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use deaddrop_client::{KeyVault, decrypt_directory, export_pending, provision_keypairs};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Deaddrop recipient tooling
#[derive(Parser, Debug)]
#[command(name = "deaddrop-recipient")]
#[command(about = "Key vault, key generation and bundle decryption for the deaddrop recipient")]
#[command(version)]
struct Args {
    /// Path to the key vault database
    #[arg(long, default_value = "vault.redb")]
    vault: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate RSA key pairs offline into the vault
    Generate {
        /// Number of key pairs
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Modulus size in bits
        #[arg(long, default_value_t = 2048)]
        bits: usize,
    },

    /// Write un-uploaded public halves as PEM files for the upload tooling
    Export {
        /// Output directory for the PEM files
        #[arg(long)]
        out: PathBuf,
    },

    /// Decrypt a fetched bundle directory
    Decrypt {
        /// Directory holding ciphertexts and key-info files
        #[arg(long)]
        input: PathBuf,

        /// Directory to write plaintext into
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let vault = KeyVault::open(&args.vault)?;

    match args.command {
        Command::Generate { count, bits } => {
            let ids = provision_keypairs(&vault, count, bits)?;
            tracing::info!(count = ids.len(), bits, "key pairs generated");
        },
        Command::Export { out } => {
            let exports = export_pending(&vault)?;
            if exports.is_empty() {
                tracing::info!("nothing pending upload");
                return Ok(());
            }

            fs::create_dir_all(&out)?;
            for export in &exports {
                fs::write(out.join(format!("{}.pem", export.id)), &export.public_key_pem)?;
            }
            // The uploaded flag flips only after the relay confirms; the
            // upload tooling calls back into `confirm_uploaded` for that.
            tracing::info!(count = exports.len(), out = %out.display(), "public halves exported");
        },
        Command::Decrypt { input, output } => {
            let summary = decrypt_directory(&vault, &input, &output)?;
            tracing::info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                output = %output.display(),
                "bundle decrypted"
            );
        },
    }

    Ok(())
}
