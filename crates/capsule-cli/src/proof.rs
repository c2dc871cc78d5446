//! # Proof Subcommand
//!
//! Offline inspection of stored proofs: a readable tree dump, or the raw
//! `.ots` bytes for use with other OpenTimestamps tooling.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use capsule_core::{Record, RecordId};
use capsule_pipeline::RecordStore;
use capsule_proof::proof_info;
use clap::{Args, Subcommand};

use crate::verify::parse_id;

/// Arguments for the proof subcommand.
#[derive(Args, Debug)]
pub struct ProofArgs {
    #[command(subcommand)]
    pub command: ProofCommand,
}

/// Proof operations.
#[derive(Subcommand, Debug)]
pub enum ProofCommand {
    /// Print the proof as an operation tree.
    Info {
        /// Record identifier.
        id: String,
    },

    /// Write the raw `.ots` proof to a file.
    Export {
        /// Record identifier.
        id: String,

        /// Output path (default: `timecapsule-<id>.ots`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Execute the proof subcommand.
pub async fn run_proof(args: &ProofArgs, records: &dyn RecordStore) -> Result<u8> {
    match &args.command {
        ProofCommand::Info { id } => {
            let record = load_with_proof(records, id).await?;
            println!("{}", proof_info(&record.proof));
        }
        ProofCommand::Export { id, out } => {
            let record = load_with_proof(records, id).await?;
            let path = out
                .clone()
                .unwrap_or_else(|| default_export_path(&record.id));
            export(&record, &path)?;
            println!("{}", path.display());
        }
    }
    Ok(0)
}

/// `timecapsule-<id>.ots` in the working directory.
pub fn default_export_path(id: &RecordId) -> PathBuf {
    PathBuf::from(format!("timecapsule-{id}.ots"))
}

async fn load_with_proof(records: &dyn RecordStore, raw_id: &str) -> Result<Record> {
    let id = parse_id(raw_id)?;
    let record = records
        .get(&id)
        .await?
        .with_context(|| format!("record {id} not found"))?;
    if record.proof.is_empty() {
        bail!("record {id} has no timestamp proof yet (status {})", record.proof_status);
    }
    Ok(record)
}

fn export(record: &Record, path: &Path) -> Result<()> {
    std::fs::write(path, record.proof.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(record = %record.id, path = %path.display(), bytes = record.proof.len(), "proof exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_core::{ContentDigest, ProofStatus, SourceDescriptor, TimestampProof};
    use capsule_pipeline::MemoryRecordStore;

    fn record(proof: Vec<u8>, status: ProofStatus) -> Record {
        Record::new(
            ContentDigest::from_bytes([4; 32]),
            None,
            TimestampProof::new(proof),
            status,
            SourceDescriptor::file("a.txt", None),
        )
    }

    #[tokio::test]
    async fn export_writes_raw_proof_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryRecordStore::new();
        let r = record(vec![0x00, 0x4f, 0x70], ProofStatus::Incomplete);
        store.put(&r).await.unwrap();

        let out = dir.path().join("proof.ots");
        let args = ProofArgs {
            command: ProofCommand::Export {
                id: r.id.to_string(),
                out: Some(out.clone()),
            },
        };
        assert_eq!(run_proof(&args, &store).await.unwrap(), 0);
        assert_eq!(std::fs::read(out).unwrap(), vec![0x00, 0x4f, 0x70]);
    }

    #[tokio::test]
    async fn pending_and_unknown_records_are_errors() {
        let store = MemoryRecordStore::new();
        let pending = record(Vec::new(), ProofStatus::Pending);
        store.put(&pending).await.unwrap();

        let err = load_with_proof(&store, &pending.id.to_string()).await.unwrap_err();
        assert!(err.to_string().contains("no timestamp proof yet"));

        let err = load_with_proof(&store, &RecordId::new().to_string()).await.unwrap_err();
        assert!(err.to_string().contains("not found"));

        assert!(load_with_proof(&store, "garbage").await.is_err());
    }

    #[test]
    fn default_path_names_the_record() {
        let id = RecordId::new();
        assert_eq!(
            default_export_path(&id),
            PathBuf::from(format!("timecapsule-{id}.ots"))
        );
    }
}
