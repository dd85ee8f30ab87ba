// src/engine/context.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info};

use crate::artifact::{OutputInspector, publish_artifact};
use crate::config::{AppConfig, FeedList, load_and_validate, save_to_path};
use crate::engine::lifecycle::{LifecycleManager, SchedulerStart, ServerStart};
use crate::errors::{FeedpipeError, Result};
use crate::exec::{PipelineExecutor, PipelineReport, ProcessStageRunner, StageBackend};
use crate::history::{JobHistory, TriggerReason};
use crate::schedule::ScheduleConfig;

/// The single long-lived application context.
///
/// Owns the configuration, the feed list, the job history, the pipeline
/// executor and the lifecycle manager. Everything that reads or appends
/// shared state goes through a reference to this.
#[derive(Debug)]
pub struct AppContext {
    config_path: PathBuf,
    config: RwLock<AppConfig>,
    feeds: RwLock<FeedList>,
    history: Arc<JobHistory>,
    inspector: OutputInspector,
    executor: Arc<PipelineExecutor>,
    lifecycle: LifecycleManager,
}

impl AppContext {
    pub fn new(
        config_path: impl Into<PathBuf>,
        config: AppConfig,
        feeds: FeedList,
        backend: Arc<dyn StageBackend>,
    ) -> Self {
        let history = Arc::new(JobHistory::new());
        let inspector = OutputInspector::new(&config.paths.artifact);
        let executor = PipelineExecutor::new(
            config.stage_specs(),
            backend,
            inspector.clone(),
            Arc::clone(&history),
        )
        .with_publish_root(&config.paths.static_root)
        .with_overlap(config.pipeline.allow_overlap);

        Self {
            config_path: config_path.into(),
            config: RwLock::new(config),
            feeds: RwLock::new(feeds),
            history,
            inspector,
            executor: Arc::new(executor),
            lifecycle: LifecycleManager::new(),
        }
    }

    /// Load config and feeds from disk and wire the real process runner.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config = load_and_validate(config_path)?;
        let feeds = FeedList::load(&config.paths.feeds)?;
        info!(
            config = ?config_path,
            feeds = feeds.len(),
            artifact = ?config.paths.artifact,
            "configuration loaded"
        );
        Ok(Self::new(
            config_path,
            config,
            feeds,
            Arc::new(ProcessStageRunner::new()),
        ))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn feeds(&self) -> FeedList {
        self.feeds.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn history(&self) -> &Arc<JobHistory> {
        &self.history
    }

    pub fn inspector(&self) -> &OutputInspector {
        &self.inspector
    }

    pub fn executor(&self) -> &Arc<PipelineExecutor> {
        &self.executor
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Create the directories the stages and the server expect.
    pub fn ensure_workspace_dirs(&self) -> Result<()> {
        let cfg = self.config();
        let mut dirs = vec![
            cfg.folders.output_folder.clone(),
            cfg.folders.rewritten_folder.clone(),
            cfg.paths.static_root.clone(),
        ];
        dirs.extend(cfg.paths.feeds.parent().map(Path::to_path_buf));
        dirs.extend(cfg.paths.artifact.parent().map(Path::to_path_buf));

        for dir in dirs.into_iter().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(&dir)?;
            debug!(dir = ?dir, "ensured directory");
        }
        Ok(())
    }

    /// Manual "run now": runs inline and returns once all stages finished.
    pub async fn run_now(&self) -> Result<PipelineReport> {
        self.executor.run_all(TriggerReason::Manual).await
    }

    /// Publish the current artifact and start the file server.
    pub async fn start_server(&self) -> Result<ServerStart> {
        let cfg = self.config();
        publish_artifact(&cfg.paths.artifact, &cfg.paths.static_root)?;
        self.lifecycle.start_server(&cfg.server_settings()).await
    }

    pub async fn stop_server(&self) -> bool {
        let cfg = self.config();
        self.lifecycle
            .stop_server(cfg.server.stop_mode, grace_period(&cfg))
            .await
    }

    /// Start the scheduler as configured (no-op when scheduling is disabled).
    pub async fn start_scheduler(&self) -> SchedulerStart {
        let schedule = self.config().schedule();
        self.lifecycle
            .start_scheduler(schedule, Arc::clone(&self.executor))
            .await
    }

    /// Apply a new schedule at runtime: stores it in the config and restarts
    /// (or stops) the schedule loop accordingly. Not persisted until
    /// [`save_configuration`](Self::save_configuration).
    pub async fn update_schedule(&self, schedule: ScheduleConfig) -> Result<SchedulerStart> {
        if schedule.interval == 0 {
            return Err(FeedpipeError::ConfigError(
                "scheduling_interval must be >= 1 (got 0)".to_string(),
            ));
        }
        self.config
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .set_schedule(schedule);

        info!(schedule = %schedule, "schedule updated");
        Ok(self
            .lifecycle
            .reschedule(schedule, Arc::clone(&self.executor))
            .await)
    }

    /// Write the config document and the feed list to disk.
    pub fn save_configuration(&self) -> Result<()> {
        let cfg = self.config();
        save_to_path(&self.config_path, &cfg)?;
        self.feeds().save(&cfg.paths.feeds)?;
        info!(config = ?self.config_path, feeds = ?cfg.paths.feeds, "configuration and feeds saved");
        Ok(())
    }

    /// Stop the scheduler and the file server.
    pub async fn shutdown(&self) {
        let grace = grace_period(&self.config());
        self.lifecycle.shutdown(grace).await;
    }
}

fn grace_period(cfg: &AppConfig) -> Duration {
    Duration::from_secs(cfg.server.shutdown_grace_secs)
}
