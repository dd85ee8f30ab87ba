// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::AppConfig;
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Load a configuration file and return the default-filled `AppConfig`.
///
/// A missing file is not an error: the operator has simply not saved a
/// configuration yet, so every key takes its default. This only performs
/// TOML deserialization; use [`load_and_validate`] for semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = ?path, "config file not found; using defaults");
        return Ok(AppConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    debug!(path = ?path, "config loaded");
    if !config.extra.is_empty() {
        debug!(
            keys = ?config.extra.keys().collect::<Vec<_>>(),
            "keeping top-level keys feedpipe does not use"
        );
    }

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the entry point the rest of the application uses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<AppConfig> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Write the configuration back to disk as TOML, creating parent
/// directories as needed.
pub fn save_to_path(path: impl AsRef<Path>, config: &AppConfig) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(path, contents)?;
    debug!(path = ?path, "config saved");
    Ok(())
}

/// Default config location: `config.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiProvider, ScheduleUnit};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from_path(dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn present_keys_win_over_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
max_items = 7
scheduling_period = "hours"

[api_config]
selected_api = "Groq"
groq_model = "mixtral"

[similarity_options]
eps = 0.3
"#,
        )
        .unwrap();

        assert_eq!(cfg.max_items, 7);
        assert_eq!(cfg.scheduling_period, ScheduleUnit::Hours);
        assert_eq!(cfg.api_config.selected_api, ApiProvider::Groq);
        assert_eq!(cfg.api_config.groq_model, "mixtral");
        assert_eq!(cfg.similarity_options.eps, 0.3);

        // Siblings of present keys are back-filled.
        assert_eq!(cfg.similarity_options.min_samples, 2);
        assert_eq!(
            cfg.api_config.openai_api_url,
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(cfg.max_age_days, 10);
        assert_eq!(cfg.pipeline.stages.len(), 3);
    }

    #[test]
    fn save_then_load_preserves_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.content_prefix = "Rewrite as a news anchor".to_string();
        cfg.scheduling_enabled = true;
        save_to_path(&path, &cfg).unwrap();

        let loaded = load_and_validate(&path).unwrap();
        assert_eq!(loaded, cfg);
    }
}
