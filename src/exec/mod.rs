// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`stage`] defines what a stage is and what running one yields.
//! - [`runner`] provides the `StageBackend` trait and the
//!   `ProcessStageRunner` that spawns real processes via
//!   `tokio::process::Command`.
//! - [`pipeline`] runs the ordered stage list and records each run in the
//!   job history.

pub mod pipeline;
pub mod runner;
pub mod stage;

pub use pipeline::{PipelineExecutor, PipelineReport, StageOutcome};
pub use runner::{ProcessStageRunner, StageBackend};
pub use stage::{NO_ERRORS, NO_OUTPUT, StageResult, StageSpec};
