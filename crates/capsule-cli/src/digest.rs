//! # Digest Subcommands
//!
//! `hash` and `aggregate`: offline access to the digest engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capsule_core::ContentDigest;
use capsule_crypto::{aggregate, sha256_hex};
use clap::Args;

/// Arguments for the hash subcommand.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// File to hash.
    pub path: PathBuf,
}

/// Arguments for the aggregate subcommand.
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Hex-encoded SHA-256 digests, in leaf order.
    #[arg(required = true, num_args = 1..)]
    pub digests: Vec<String>,
}

/// Print the SHA-256 of a file.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    println!("{}", hash_file(&args.path)?);
    Ok(0)
}

/// Print the merkle aggregate of the given digests.
pub fn run_aggregate(args: &AggregateArgs) -> Result<u8> {
    println!("{}", aggregate_hex(&args.digests)?);
    Ok(0)
}

fn hash_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(sha256_hex(&bytes))
}

fn aggregate_hex(digests: &[String]) -> Result<String> {
    let leaves = digests
        .iter()
        .map(|hex| ContentDigest::from_hex(hex).with_context(|| format!("invalid digest {hex:?}")))
        .collect::<Result<Vec<_>>>()?;
    Ok(aggregate(&leaves)?.to_hex())
}
