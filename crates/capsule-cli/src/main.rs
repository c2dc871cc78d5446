//! # capsule CLI entry point
//!
//! Parses command-line arguments, installs logging and dispatches to the
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use capsule_cli::capture::{run_capture, CaptureArgs};
use capsule_cli::context::{build_pipeline, load_config};
use capsule_cli::digest::{run_aggregate, run_hash, AggregateArgs, HashArgs};
use capsule_cli::proof::{run_proof, ProofArgs};
use capsule_cli::verify::{run_upgrade, run_verify, UpgradeArgs, VerifyArgs};
use capsule_pipeline::FsRecordStore;

/// TimeCapsule evidence CLI
///
/// Captures web pages and files, commits to their SHA-256 digest in
/// OpenTimestamps proofs anchored in Bitcoin, and verifies records later
/// against the proof, the ledger and the stored bytes.
#[derive(Parser, Debug)]
#[command(name = "capsule", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Data directory for blobs and records (overrides CAPSULE_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture a web page or a local file into a new evidence record.
    Capture(CaptureArgs),

    /// Verify a record against its proof, the ledger and the stored bytes.
    Verify(VerifyArgs),

    /// Resubmit a pending proof or upgrade an incomplete one.
    Upgrade(UpgradeArgs),

    /// Inspect or export a record's timestamp proof.
    Proof(ProofArgs),

    /// Print the SHA-256 digest of a file.
    Hash(HashArgs),

    /// Print the merkle aggregate of digests.
    Aggregate(AggregateArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    tracing::debug!("capsule CLI starting");

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let data_dir = cli.data_dir.as_deref();
    match cli.command {
        Commands::Hash(args) => run_hash(&args),
        Commands::Aggregate(args) => run_aggregate(&args),
        Commands::Proof(args) => {
            let config = load_config(data_dir)?;
            let records = FsRecordStore::new(config.record_dir());
            run_proof(&args, &records).await
        }
        Commands::Capture(args) => {
            let pipeline = build_pipeline(&load_config(data_dir)?)?;
            run_capture(&args, &pipeline).await
        }
        Commands::Verify(args) => {
            let pipeline = build_pipeline(&load_config(data_dir)?)?;
            run_verify(&args, &pipeline).await
        }
        Commands::Upgrade(args) => {
            let pipeline = build_pipeline(&load_config(data_dir)?)?;
            run_upgrade(&args, &pipeline).await
        }
    }
}
