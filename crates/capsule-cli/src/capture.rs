//! # Capture Subcommand
//!
//! `capsule capture url <URL>` and `capsule capture file <PATH>`. The new
//! record is printed as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capsule_core::Record;
use capsule_pipeline::Pipeline;
use clap::{Args, Subcommand};

/// Arguments for the capture subcommand.
#[derive(Args, Debug)]
pub struct CaptureArgs {
    #[command(subcommand)]
    pub command: CaptureCommand,
}

/// What to capture.
#[derive(Subcommand, Debug)]
pub enum CaptureCommand {
    /// Render, sanitize and timestamp a web page.
    Url {
        /// Page URL.
        url: String,
    },

    /// Timestamp a local file as-is.
    File {
        /// File path.
        path: PathBuf,
    },
}

/// Execute the capture subcommand.
pub async fn run_capture(args: &CaptureArgs, pipeline: &Pipeline) -> Result<u8> {
    let record = match &args.command {
        CaptureCommand::Url { url } => pipeline
            .capture
            .capture_url(url)
            .await
            .with_context(|| format!("failed to capture {url}"))?,
        CaptureCommand::File { path } => capture_file(pipeline, path).await?,
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(0)
}

async fn capture_file(pipeline: &Pipeline, path: &Path) -> Result<Record> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    pipeline
        .capture
        .capture_upload(bytes, &filename)
        .await
        .with_context(|| format!("failed to capture {}", path.display()))
}
