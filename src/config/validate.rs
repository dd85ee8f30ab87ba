// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::AppConfig;
use crate::errors::{FeedpipeError, Result};

/// Number of stages the pipeline runs, in order: fetch, rewrite, regenerate.
pub const PIPELINE_STAGE_COUNT: usize = 3;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - the pipeline has exactly three stages with unique, non-empty names and
///   non-empty programs
/// - `scheduling_interval >= 1`
/// - similarity and retention options are in range
/// - the artifact path names a file with an extension
pub fn validate_config(cfg: &AppConfig) -> Result<()> {
    validate_stages(cfg)?;
    validate_schedule(cfg)?;
    validate_processing_options(cfg)?;
    validate_paths(cfg)?;
    Ok(())
}

fn invalid(msg: impl Into<String>) -> FeedpipeError {
    FeedpipeError::ConfigError(msg.into())
}

fn validate_stages(cfg: &AppConfig) -> Result<()> {
    let stages = &cfg.pipeline.stages;
    if stages.len() != PIPELINE_STAGE_COUNT {
        return Err(invalid(format!(
            "[pipeline].stages must list exactly {} stages (got {})",
            PIPELINE_STAGE_COUNT,
            stages.len()
        )));
    }

    let mut seen = HashSet::new();
    for stage in stages {
        if stage.name.trim().is_empty() {
            return Err(invalid("pipeline stage with empty name"));
        }
        if stage.program.trim().is_empty() {
            return Err(invalid(format!(
                "pipeline stage '{}' has an empty program",
                stage.name
            )));
        }
        if !seen.insert(stage.name.as_str()) {
            return Err(invalid(format!(
                "duplicate pipeline stage name '{}'",
                stage.name
            )));
        }
    }

    if cfg.pipeline.stage_timeout_secs == 0 {
        return Err(invalid("[pipeline].stage_timeout_secs must be >= 1 (got 0)"));
    }

    Ok(())
}

fn validate_schedule(cfg: &AppConfig) -> Result<()> {
    if cfg.scheduling_interval == 0 {
        return Err(invalid("scheduling_interval must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_processing_options(cfg: &AppConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&cfg.similarity_threshold) {
        return Err(invalid(format!(
            "similarity_threshold must be between 0 and 1 (got {})",
            cfg.similarity_threshold
        )));
    }
    if cfg.similarity_options.eps <= 0.0 {
        return Err(invalid(format!(
            "[similarity_options].eps must be > 0 (got {})",
            cfg.similarity_options.eps
        )));
    }
    if cfg.similarity_options.min_samples == 0 {
        return Err(invalid("[similarity_options].min_samples must be >= 1 (got 0)"));
    }
    if cfg.max_items == 0 {
        return Err(invalid("max_items must be >= 1 (got 0)"));
    }
    if cfg.max_age_days == 0 {
        return Err(invalid("max_age_days must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_paths(cfg: &AppConfig) -> Result<()> {
    let artifact = &cfg.paths.artifact;
    if artifact.file_name().is_none() || artifact.extension().is_none() {
        return Err(invalid(format!(
            "[paths].artifact must name a file with an extension (got {:?})",
            artifact
        )));
    }
    Ok(())
}
