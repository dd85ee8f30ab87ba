// src/schedule/scheduler.rs

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::errors::FeedpipeError;
use crate::exec::PipelineExecutor;
use crate::history::{JobRecord, TriggerReason};
use crate::schedule::ScheduleConfig;

/// Handle to a running schedule loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    config: ScheduleConfig,
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn config(&self) -> ScheduleConfig {
        self.config
    }

    pub fn is_alive(&self) -> bool {
        !self.join.is_finished()
    }

    /// Ask the loop to exit before its next tick.
    ///
    /// A scheduled run already in flight is not cancelled; it finishes and
    /// records its result, then the loop exits.
    pub fn stop(self) -> JoinHandle<()> {
        self.shutdown.notify_one();
        self.join
    }
}

/// Spawn the schedule loop.
///
/// The first fire happens one full period after the call; missed ticks
/// (because a run took longer than the period) are skipped.
pub fn spawn_scheduler(config: ScheduleConfig, executor: Arc<PipelineExecutor>) -> SchedulerHandle {
    let shutdown = Arc::new(Notify::new());
    let join = tokio::spawn(run_schedule_loop(config, executor, Arc::clone(&shutdown)));
    SchedulerHandle {
        config,
        shutdown,
        join,
    }
}

async fn run_schedule_loop(
    config: ScheduleConfig,
    executor: Arc<PipelineExecutor>,
    shutdown: Arc<Notify>,
) {
    let period = config.period();
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(schedule = %config, period_secs = period.as_secs(), "scheduler started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => {
                info!("scheduler stopped");
                break;
            }
            _ = timer.tick() => {
                run_scheduled_job(&executor).await;
            }
        }
    }
}

/// One tick: run the pipeline and append the "Scheduled Job" marker.
///
/// Every failure is logged and swallowed so the loop keeps running.
async fn run_scheduled_job(executor: &Arc<PipelineExecutor>) {
    debug!("scheduled tick");

    let run = {
        let executor = Arc::clone(executor);
        tokio::spawn(async move { executor.run_all(TriggerReason::Scheduled).await })
    };

    match run.await {
        Ok(Ok(report)) => {
            executor
                .history()
                .append(JobRecord::scheduled_marker(report.record.run_id));
            info!(
                run_id = report.record.run_id,
                new_items = ?report.record.new_items,
                "scheduled run recorded"
            );
        }
        Ok(Err(FeedpipeError::RunInProgress)) => {
            warn!("pipeline already running; skipping this scheduled tick");
        }
        Ok(Err(err)) => {
            error!(error = %err, "scheduled run failed");
        }
        Err(join_err) => {
            error!(error = %join_err, "scheduled run panicked");
        }
    }
}
