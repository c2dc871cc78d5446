//! Configuration loading shared by the subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use capsule_pipeline::{Pipeline, PipelineConfig};

/// Load `CAPSULE_*` configuration, with `--data-dir` taking precedence.
pub fn load_config(data_dir: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env().context("invalid CAPSULE_* configuration")?;
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");
    Ok(config)
}

/// Production pipeline for `config`.
pub fn build_pipeline(config: &PipelineConfig) -> Result<Pipeline> {
    Pipeline::from_config(config).context("failed to set up the evidence pipeline")
}
