// tests/lifecycle.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use feedpipe::artifact::OutputInspector;
use feedpipe::engine::{LifecycleManager, SchedulerStart, ServerStart};
use feedpipe::errors::FeedpipeError;
use feedpipe::exec::{PipelineExecutor, StageSpec};
use feedpipe::history::JobHistory;
use feedpipe::schedule::ScheduleConfig;
use feedpipe::server::ServerSettings;
use feedpipe::types::{ScheduleUnit, StopMode};
use feedpipe_test_utils::{ScriptedStages, init_tracing};

type TestResult = Result<(), Box<dyn Error>>;

const GRACE: Duration = Duration::from_secs(1);

fn settings(dir: &TempDir, port: u16) -> ServerSettings {
    ServerSettings {
        bind_address: "127.0.0.1".to_string(),
        port,
        static_root: dir.path().to_path_buf(),
        artifact_extension: "xml".to_string(),
    }
}

fn executor(dir: &TempDir) -> Arc<PipelineExecutor> {
    Arc::new(PipelineExecutor::new(
        vec![StageSpec::new("only", "unused", vec![])],
        Arc::new(ScriptedStages::new()),
        OutputInspector::new(dir.path().join("feed.xml")),
        Arc::new(JobHistory::new()),
    ))
}

#[tokio::test]
async fn second_server_start_reuses_the_running_instance() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let lifecycle = LifecycleManager::new();

    let ServerStart::Started(addr) = lifecycle.start_server(&settings(&dir, 0)).await? else {
        panic!("first start should spawn a server");
    };
    let again = lifecycle.start_server(&settings(&dir, addr.port())).await?;
    assert_eq!(again, ServerStart::AlreadyRunning(addr));
    assert_eq!(lifecycle.server_addr().await, Some(addr));

    assert!(lifecycle.stop_server(StopMode::Hard, GRACE).await);
    assert_eq!(lifecycle.server_addr().await, None);
    Ok(())
}

#[tokio::test]
async fn stopping_an_absent_server_is_a_warning_not_an_error() {
    init_tracing();
    let lifecycle = LifecycleManager::new();
    assert!(!lifecycle.stop_server(StopMode::Hard, GRACE).await);
    assert!(!lifecycle.stop_server(StopMode::Soft, GRACE).await);
}

#[tokio::test]
async fn restart_after_hard_stop_binds_the_same_port() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let lifecycle = LifecycleManager::new();

    let ServerStart::Started(addr) = lifecycle.start_server(&settings(&dir, 0)).await? else {
        panic!("first start should spawn a server");
    };
    lifecycle.stop_server(StopMode::Hard, GRACE).await;

    let restarted = lifecycle.start_server(&settings(&dir, addr.port())).await?;
    assert_eq!(restarted, ServerStart::Started(addr));

    lifecycle.shutdown(GRACE).await;
    Ok(())
}

#[tokio::test]
async fn soft_stop_leaves_the_port_taken() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let lifecycle = LifecycleManager::new();

    let ServerStart::Started(addr) = lifecycle.start_server(&settings(&dir, 0)).await? else {
        panic!("first start should spawn a server");
    };
    assert!(lifecycle.stop_server(StopMode::Soft, GRACE).await);
    assert_eq!(lifecycle.server_addr().await, None);

    match lifecycle.start_server(&settings(&dir, addr.port())).await {
        Err(FeedpipeError::PortInUse { port }) => assert_eq!(port, addr.port()),
        other => panic!("expected PortInUse, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn scheduler_is_tracked_once_and_can_be_reconfigured() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let executor = executor(&dir);
    let lifecycle = LifecycleManager::new();

    let disabled = ScheduleConfig {
        enabled: false,
        interval: 5,
        unit: ScheduleUnit::Minutes,
    };
    assert_eq!(
        lifecycle.start_scheduler(disabled, Arc::clone(&executor)).await,
        SchedulerStart::Disabled
    );
    assert_eq!(lifecycle.scheduler_config().await, None);

    let every_five = ScheduleConfig::every(5, ScheduleUnit::Minutes);
    assert_eq!(
        lifecycle.start_scheduler(every_five, Arc::clone(&executor)).await,
        SchedulerStart::Started(every_five)
    );
    assert_eq!(
        lifecycle.start_scheduler(every_five, Arc::clone(&executor)).await,
        SchedulerStart::AlreadyRunning(every_five)
    );

    let daily = ScheduleConfig::every(1, ScheduleUnit::Days);
    assert_eq!(
        lifecycle.reschedule(daily, Arc::clone(&executor)).await,
        SchedulerStart::Started(daily)
    );
    assert_eq!(lifecycle.scheduler_config().await, Some(daily));

    assert_eq!(
        lifecycle.reschedule(disabled, Arc::clone(&executor)).await,
        SchedulerStart::Disabled
    );
    assert_eq!(lifecycle.scheduler_config().await, None);
    assert!(!lifecycle.stop_scheduler().await);
}

#[tokio::test(start_paused = true)]
async fn rescheduled_loop_uses_the_new_period() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let executor = executor(&dir);
    let history = Arc::clone(executor.history());
    let lifecycle = LifecycleManager::new();

    lifecycle
        .start_scheduler(
            ScheduleConfig::every(1, ScheduleUnit::Hours),
            Arc::clone(&executor),
        )
        .await;
    tokio::time::sleep(Duration::from_secs(30 * 60)).await;

    lifecycle
        .reschedule(
            ScheduleConfig::every(1, ScheduleUnit::Minutes),
            Arc::clone(&executor),
        )
        .await;
    tokio::time::sleep(Duration::from_secs(61)).await;

    // One run plus its marker, from the new one-minute loop only.
    assert_eq!(history.len(), 2);
    lifecycle.stop_scheduler().await;
}
