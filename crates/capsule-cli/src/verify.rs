//! # Verify and Upgrade Subcommands

use anyhow::{Context, Result};
use capsule_core::RecordId;
use capsule_pipeline::Pipeline;
use clap::Args;

/// Exit code when verification ran but the record is not fully verified.
pub const EXIT_NOT_VERIFIED: u8 = 2;

/// Arguments for the verify subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Record identifier.
    pub id: String,
}

/// Arguments for the upgrade subcommand.
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Record identifier.
    pub id: String,
}

/// Verify a record and print the result as JSON.
pub async fn run_verify(args: &VerifyArgs, pipeline: &Pipeline) -> Result<u8> {
    let id = parse_id(&args.id)?;
    let verification = pipeline.verifier.verify_by_id(&id).await?;
    println!("{}", serde_json::to_string_pretty(&verification)?);
    Ok(if verification.fully_verified() {
        0
    } else {
        EXIT_NOT_VERIFIED
    })
}

/// Try to advance a record's proof and print the resulting status.
pub async fn run_upgrade(args: &UpgradeArgs, pipeline: &Pipeline) -> Result<u8> {
    let id = parse_id(&args.id)?;
    let record = pipeline.verifier.refresh_by_id(&id).await?;
    println!("{} {}", record.id, record.proof_status);
    Ok(0)
}

pub(crate) fn parse_id(raw: &str) -> Result<RecordId> {
    raw.parse::<RecordId>()
        .with_context(|| format!("{raw:?} is not a record id"))
}
