// src/history.rs

//! Process-lifetime job history.
//!
//! `JobHistory` is an append-only log of [`JobRecord`]s shared by the manual
//! trigger path and the scheduler. Records are immutable once appended; the
//! log is never truncated and is lost on restart.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};

/// Marker used as the stage label of the secondary record the scheduler
/// appends after each scheduled run.
pub const SCHEDULED_JOB_MARKER: &str = "Scheduled Job";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failure,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Success => f.write_str("Success"),
            JobStatus::Failure => f.write_str("Failure"),
        }
    }
}

/// Why a pipeline run started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Operator asked for a run (CLI `run`, console `run`).
    Manual,
    /// The scheduler's ticker fired.
    Scheduled,
}

/// One completed pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub run_id: u64,
    pub trigger: TriggerReason,
    /// Stages that ran, in order, or `[SCHEDULED_JOB_MARKER]`.
    pub stage_names: Vec<String>,
    pub timestamp: DateTime<Local>,
    pub status: JobStatus,
    /// Item delta measured around the run; absent on scheduler markers.
    pub new_items: Option<i64>,
}

impl JobRecord {
    /// Record for a full pipeline run.
    pub fn pipeline_run(
        run_id: u64,
        trigger: TriggerReason,
        stage_names: Vec<String>,
        status: JobStatus,
        new_items: i64,
    ) -> Self {
        Self {
            run_id,
            trigger,
            stage_names,
            timestamp: Local::now(),
            status,
            new_items: Some(new_items),
        }
    }

    /// Secondary record tagged "Scheduled Job", appended by the scheduler
    /// after the run it annotates.
    pub fn scheduled_marker(run_id: u64) -> Self {
        Self {
            run_id,
            trigger: TriggerReason::Scheduled,
            stage_names: vec![SCHEDULED_JOB_MARKER.to_string()],
            timestamp: Local::now(),
            status: JobStatus::Success,
            new_items: None,
        }
    }

    /// Stage names joined with ", ".
    pub fn label(&self) -> String {
        self.stage_names.join(", ")
    }

    pub fn is_scheduled_marker(&self) -> bool {
        self.new_items.is_none() && self.stage_names == [SCHEDULED_JOB_MARKER]
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Script:    {}", self.label())?;
        writeln!(f, "Time:      {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Status:    {}", self.status)?;
        write!(f, "New Items: {}", self.new_items.unwrap_or(0))
    }
}

/// Thread-safe append-only log of job records.
#[derive(Debug, Default)]
pub struct JobHistory {
    records: Mutex<Vec<JobRecord>>,
}

impl JobHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: JobRecord) {
        self.lock().push(record);
    }

    /// Copy of every record, in completion order.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<JobRecord> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Poisoning is ignored: a push either happened or it did not.
    fn lock(&self) -> MutexGuard<'_, Vec<JobRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
