// src/config/model.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::exec::StageSpec;
use crate::schedule::ScheduleConfig;
use crate::server::ServerSettings;
use crate::types::{ApiProvider, ScheduleUnit, StopMode};

const DEFAULT_CONTENT_PREFIX: &str = "In qualità di giornalista esperto, utilizza un tono professionale, preciso e dettagliato...";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// similarity_threshold = 0.66
/// max_items = 50
/// scheduling_enabled = true
/// scheduling_interval = 4
/// scheduling_period = "hours"
///
/// [api_config]
/// selected_api = "Groq"
/// groq_api_key = "..."
///
/// [[pipeline.stages]]
/// name = "fetch"
/// program = "python"
/// args = ["main.py"]
/// ```
///
/// Every section and key is optional. Missing keys are filled from the
/// defaults below when the document is deserialized; keys that are present
/// are never overwritten.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub similarity_threshold: f64,
    pub similarity_options: SimilarityOptions,
    pub api_config: ApiConfig,
    pub folders: Folders,
    pub content_prefix: String,
    pub max_items: u32,
    pub max_age_days: u32,
    pub scheduling_enabled: bool,
    pub scheduling_interval: u32,
    pub scheduling_period: ScheduleUnit,
    pub paths: PathsSection,
    pub pipeline: PipelineSection,
    pub server: ServerSection,
    /// Keys this program does not read; written back unchanged on save.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.66,
            similarity_options: SimilarityOptions::default(),
            api_config: ApiConfig::default(),
            folders: Folders::default(),
            content_prefix: DEFAULT_CONTENT_PREFIX.to_string(),
            max_items: 50,
            max_age_days: 10,
            scheduling_enabled: false,
            scheduling_interval: 2,
            scheduling_period: ScheduleUnit::Minutes,
            paths: PathsSection::default(),
            pipeline: PipelineSection::default(),
            server: ServerSection::default(),
            extra: toml::Table::new(),
        }
    }
}

impl AppConfig {
    /// The schedule as the scheduler sees it.
    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            enabled: self.scheduling_enabled,
            interval: self.scheduling_interval,
            unit: self.scheduling_period,
        }
    }

    pub fn set_schedule(&mut self, schedule: ScheduleConfig) {
        self.scheduling_enabled = schedule.enabled;
        self.scheduling_interval = schedule.interval;
        self.scheduling_period = schedule.unit;
    }

    /// The ordered stage list the pipeline runs.
    pub fn stage_specs(&self) -> Vec<StageSpec> {
        let timeout = std::time::Duration::from_secs(self.pipeline.stage_timeout_secs);
        self.pipeline
            .stages
            .iter()
            .map(|s| {
                let spec = StageSpec::new(&s.name, &s.program, s.args.clone()).with_timeout(timeout);
                match &s.working_dir {
                    Some(dir) => spec.with_working_dir(dir),
                    None => spec,
                }
            })
            .collect()
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            bind_address: self.server.bind_address.clone(),
            port: self.server.port,
            static_root: self.paths.static_root.clone(),
            artifact_extension: self
                .paths
                .artifact
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "xml".to_string()),
        }
    }
}

/// `[similarity_options]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimilarityOptions {
    pub min_samples: u32,
    pub eps: f64,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            min_samples: 2,
            eps: 0.66,
            extra: toml::Table::new(),
        }
    }
}

/// `[api_config]` section: endpoints and credentials for the three provider
/// variants, plus which one the rewrite stage should use.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub selected_api: ApiProvider,
    pub openai_api_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub groq_api_url: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_api_url: String,
    pub ollama_api_key: String,
    pub ollama_model: String,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            selected_api: ApiProvider::OpenAI,
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-3.5-turbo".to_string(),
            groq_api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            groq_api_key: String::new(),
            groq_model: "llama3-70b-8192".to_string(),
            ollama_api_url: "http://localhost:11434/api/chat".to_string(),
            ollama_api_key: String::new(),
            ollama_model: "phi3".to_string(),
            extra: toml::Table::new(),
        }
    }
}

/// `[folders]` section: working directories of the fetch/rewrite stages.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Folders {
    pub output_folder: PathBuf,
    pub rewritten_folder: PathBuf,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for Folders {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("output"),
            rewritten_folder: PathBuf::from("rewritten"),
            extra: toml::Table::new(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsSection {
    /// Plain-text feed list, one URL per line.
    pub feeds: PathBuf,
    /// Feed document written by the last stage.
    pub artifact: PathBuf,
    /// Directory the file server serves from; the artifact is published here.
    pub static_root: PathBuf,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            feeds: PathBuf::from("input/feeds.txt"),
            artifact: PathBuf::from("uglyfeeds/uglyfeed.xml"),
            static_root: PathBuf::from("static"),
            extra: toml::Table::new(),
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Per-stage wall clock limit.
    pub stage_timeout_secs: u64,

    /// If false, a trigger that arrives while a run is in flight is rejected.
    pub allow_overlap: bool,

    /// Ordered stage list; must contain exactly three entries.
    pub stages: Vec<StageConfig>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 6000,
            allow_overlap: false,
            stages: vec![
                StageConfig::python("main.py"),
                StageConfig::python("llm_processor.py"),
                StageConfig::python("json2rss.py"),
            ],
            extra: toml::Table::new(),
        }
    }
}

/// `[[pipeline.stages]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StageConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Directory the stage runs in; the current directory when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl StageConfig {
    fn python(script: &str) -> Self {
        Self {
            name: script.to_string(),
            program: "python".to_string(),
            args: vec![script.to_string()],
            working_dir: None,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_address: String,
    pub port: u16,
    pub stop_mode: StopMode,
    pub shutdown_grace_secs: u64,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8001,
            stop_mode: StopMode::Hard,
            shutdown_grace_secs: 5,
            extra: toml::Table::new(),
        }
    }
}
