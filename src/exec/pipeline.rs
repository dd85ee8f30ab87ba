// src/exec/pipeline.rs

//! Pipeline executor: runs the fixed stage list in order and records the
//! outcome in the job history.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::artifact::{OutputInspector, publish_artifact};
use crate::errors::{FeedpipeError, Result};
use crate::exec::runner::StageBackend;
use crate::exec::stage::{StageResult, StageSpec};
use crate::history::{JobHistory, JobRecord, JobStatus, TriggerReason};

/// Outcome of one stage within a run. `result` is `None` when the stage
/// could not be launched.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub name: String,
    pub result: Option<StageResult>,
}

/// Everything a caller needs to display a finished run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub record: JobRecord,
    pub stages: Vec<StageOutcome>,
    /// "Output of <stage>:\n<stdout>" per stage.
    pub info_log: Vec<String>,
    /// One entry per stage that wrote to stderr or failed to launch.
    pub error_log: Vec<String>,
}

impl PipelineReport {
    pub fn consolidated_output(&self) -> String {
        self.info_log.join("\n")
    }

    pub fn consolidated_errors(&self) -> String {
        self.error_log.join("\n")
    }
}

/// Runs the ordered stage list sequentially.
///
/// Stage failures never stop the sequence: every stage runs on every run.
/// With `allow_overlap = false` at most one run is in flight; a concurrent
/// trigger gets [`FeedpipeError::RunInProgress`] instead of waiting.
pub struct PipelineExecutor {
    stages: Vec<StageSpec>,
    backend: Arc<dyn StageBackend>,
    inspector: OutputInspector,
    history: Arc<JobHistory>,
    publish_root: Option<PathBuf>,
    allow_overlap: bool,
    run_lock: Mutex<()>,
    next_run_id: AtomicU64,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("stages", &self.stage_names())
            .field("artifact", &self.inspector.path())
            .field("allow_overlap", &self.allow_overlap)
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    pub fn new(
        stages: Vec<StageSpec>,
        backend: Arc<dyn StageBackend>,
        inspector: OutputInspector,
        history: Arc<JobHistory>,
    ) -> Self {
        Self {
            stages,
            backend,
            inspector,
            history,
            publish_root: None,
            allow_overlap: false,
            run_lock: Mutex::new(()),
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Publish the artifact into this directory after every run.
    pub fn with_publish_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.publish_root = Some(root.into());
        self
    }

    pub fn with_overlap(mut self, allow_overlap: bool) -> Self {
        self.allow_overlap = allow_overlap;
        self
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name.clone()).collect()
    }

    pub fn history(&self) -> &Arc<JobHistory> {
        &self.history
    }

    /// True while a run holds the run lock.
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Run every stage once, measure the item delta, append one record to
    /// the history and return the report.
    pub async fn run_all(&self, trigger: TriggerReason) -> Result<PipelineReport> {
        let _guard = if self.allow_overlap {
            None
        } else {
            Some(
                self.run_lock
                    .try_lock()
                    .map_err(|_| FeedpipeError::RunInProgress)?,
            )
        };

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        info!(run_id, ?trigger, stages = ?self.stage_names(), "pipeline run started");

        let before = self.snapshot_item_count(run_id, "before");

        let mut outcomes = Vec::with_capacity(self.stages.len());
        let mut info_log = Vec::new();
        let mut error_log = Vec::new();
        let mut launch_failures = 0usize;

        for stage in &self.stages {
            info!(run_id, stage = %stage.name, "executing stage");
            match self.backend.run(stage).await {
                Ok(result) => {
                    info!(run_id, stage = %stage.name, "Output of {}:\n{}", stage.name, result.stdout);
                    info_log.push(format!("Output of {}:\n{}", stage.name, result.stdout));

                    if result.has_errors() {
                        error!(run_id, stage = %stage.name, "Errors or logs of {}:\n{}", stage.name, result.stderr);
                        error_log.push(format!("Errors or logs of {}:\n{}", stage.name, result.stderr));
                    }
                    if !result.success() {
                        warn!(
                            run_id,
                            stage = %stage.name,
                            exit_code = ?result.exit_code,
                            timed_out = result.timed_out,
                            "stage did not succeed; continuing with next stage"
                        );
                    }

                    outcomes.push(StageOutcome {
                        name: stage.name.clone(),
                        result: Some(result),
                    });
                }
                Err(err) => {
                    launch_failures += 1;
                    error!(run_id, stage = %stage.name, error = %err, "stage could not be started");
                    error_log.push(format!("Stage {} could not be started: {}", stage.name, err));
                    outcomes.push(StageOutcome {
                        name: stage.name.clone(),
                        result: None,
                    });
                }
            }
        }

        let after = self.snapshot_item_count(run_id, "after");
        let new_items = after - before;

        if let Some(root) = &self.publish_root {
            if let Err(err) = publish_artifact(self.inspector.path(), root) {
                warn!(run_id, error = %err, "failed to publish artifact");
            }
        }

        let status = if launch_failures == 0 {
            JobStatus::Success
        } else {
            JobStatus::Failure
        };

        let record = JobRecord::pipeline_run(run_id, trigger, self.stage_names(), status, new_items);
        self.history.append(record.clone());

        info!(run_id, %status, new_items, before, after, "pipeline run finished");

        Ok(PipelineReport {
            record,
            stages: outcomes,
            info_log,
            error_log,
        })
    }

    /// Current item count; a malformed artifact counts as 0 so the run still
    /// produces its record.
    fn snapshot_item_count(&self, run_id: u64, when: &str) -> i64 {
        match self.inspector.count_items() {
            Ok(n) => n as i64,
            Err(err) => {
                warn!(run_id, when, error = %err, "could not count artifact items; using 0");
                0
            }
        }
    }
}
