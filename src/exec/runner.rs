// src/exec/runner.rs

//! Stage runner: executes one stage as a subprocess and captures its output.
//!
//! The pipeline talks to a [`StageBackend`] instead of spawning processes
//! directly, so tests can swap in a scripted fake while production uses
//! [`ProcessStageRunner`].

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{FeedpipeError, Result};
use crate::exec::stage::{StageResult, StageSpec};

/// Trait abstracting how a single stage is executed.
///
/// Implementations must return `Ok` for every stage that was actually
/// launched, whatever its exit status. `Err` is reserved for local failures
/// that prevented the stage from running at all.
pub trait StageBackend: Send + Sync {
    fn run<'a>(
        &'a self,
        stage: &'a StageSpec,
    ) -> Pin<Box<dyn Future<Output = Result<StageResult>> + Send + 'a>>;
}

/// Real backend: spawns the stage program with no stdin, waits for it, and
/// captures the whole of stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct ProcessStageRunner;

impl ProcessStageRunner {
    pub fn new() -> Self {
        Self
    }
}

impl StageBackend for ProcessStageRunner {
    fn run<'a>(
        &'a self,
        stage: &'a StageSpec,
    ) -> Pin<Box<dyn Future<Output = Result<StageResult>> + Send + 'a>> {
        Box::pin(run_stage_process(stage))
    }
}

async fn run_stage_process(stage: &StageSpec) -> Result<StageResult> {
    info!(
        stage = %stage.name,
        cmd = %stage.command_line(),
        "starting stage process"
    );

    let mut cmd = Command::new(&stage.program);
    cmd.args(&stage.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &stage.working_dir {
        cmd.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| FeedpipeError::StageSpawn {
        stage: stage.name.clone(),
        source,
    })?;

    // Drain both pipes while the child runs so whatever it printed is kept
    // even if it has to be killed.
    let (stdout_buf, mut stdout_task) = capture(child.stdout.take());
    let (stderr_buf, mut stderr_task) = capture(child.stderr.take());

    let status = match stage.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                warn!(
                    stage = %stage.name,
                    timeout = ?limit,
                    "stage timed out; killing process"
                );
                if let Err(err) = child.kill().await {
                    warn!(stage = %stage.name, error = %err, "failed to kill stage process");
                }
                None
            }
        },
        None => Some(child.wait().await?),
    };

    // Grandchildren can hold the pipes open after the stage itself exits.
    let drained = tokio::time::timeout(DRAIN_GRACE, async {
        let _ = tokio::join!(&mut stdout_task, &mut stderr_task);
    })
    .await;
    if drained.is_err() {
        debug!(stage = %stage.name, "stage pipes still open; keeping output read so far");
        stdout_task.abort();
        stderr_task.abort();
    }

    let stdout = take_captured(&stdout_buf);
    let stderr = take_captured(&stderr_buf);
    debug!(
        stage = %stage.name,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "captured stage output"
    );

    let result = match status {
        Some(status) => {
            StageResult::from_streams(&stdout, &stderr, status.code(), started.elapsed())
        }
        None => {
            let note = format!(
                "Stage {} timed out after {:?} and was killed",
                stage.name,
                stage.timeout.unwrap_or_default()
            );
            let stderr = match stderr.trim_end() {
                "" => note,
                before => format!("{before}\n{note}"),
            };
            StageResult {
                timed_out: true,
                ..StageResult::from_streams(&stdout, &stderr, None, started.elapsed())
            }
        }
    };

    info!(
        stage = %stage.name,
        exit_code = ?result.exit_code,
        success = result.success(),
        timed_out = result.timed_out,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "stage process finished"
    );

    Ok(result)
}

/// How long to keep reading the pipes once the stage process is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

type Captured = Arc<Mutex<Vec<u8>>>;

/// Read `pipe` to its end on a background task, appending into a shared
/// buffer that stays readable if the task is aborted.
fn capture<R>(pipe: Option<R>) -> (Captured, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Captured::default();
    let sink = Arc::clone(&buf);
    let task = tokio::spawn(async move {
        let Some(mut pipe) = pipe else { return };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .extend_from_slice(&chunk[..n]),
            }
        }
    });
    (buf, task)
}

fn take_captured(buf: &Captured) -> String {
    let bytes = std::mem::take(&mut *buf.lock().unwrap_or_else(|p| p.into_inner()));
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::exec::stage::{NO_ERRORS, NO_OUTPUT};

    fn sh(name: &str, script: &str) -> StageSpec {
        StageSpec::new(name, "sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let runner = ProcessStageRunner::new();
        let res = runner
            .run(&sh("mixed", "echo out; echo err 1>&2; exit 3"))
            .await
            .unwrap();

        assert_eq!(res.stdout, "out");
        assert_eq!(res.stderr, "err");
        assert_eq!(res.exit_code, Some(3));
        assert!(!res.timed_out);
    }

    #[tokio::test]
    async fn silent_stage_reports_placeholders() {
        let res = ProcessStageRunner::new().run(&sh("quiet", "true")).await.unwrap();
        assert_eq!(res.stdout, NO_OUTPUT);
        assert_eq!(res.stderr, NO_ERRORS);
        assert!(res.success());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = StageSpec::new("ghost", "/definitely/not/a/program", vec![]);
        match ProcessStageRunner::new().run(&spec).await {
            Err(FeedpipeError::StageSpawn { stage, .. }) => assert_eq!(stage, "ghost"),
            other => panic!("expected StageSpawn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stage_runs_in_its_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let spec = sh("where", "pwd").with_working_dir(dir.path());
        let res = ProcessStageRunner::new().run(&spec).await.unwrap();
        assert_eq!(
            std::fs::canonicalize(&res.stdout).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn slow_stage_is_killed_at_timeout() {
        let spec = sh("sleepy", "sleep 5").with_timeout(Duration::from_millis(200));
        let res = ProcessStageRunner::new().run(&spec).await.unwrap();
        assert!(res.timed_out);
        assert_eq!(res.exit_code, None);
        assert!(res.stderr.contains("timed out"));
        assert_eq!(res.stdout, NO_OUTPUT);
    }

    #[tokio::test]
    async fn timed_out_stage_keeps_output_printed_before_the_kill() {
        let spec = sh("partial", "echo fetched 2 of 5; echo slow feed 1>&2; sleep 5")
            .with_timeout(Duration::from_millis(300));
        let res = ProcessStageRunner::new().run(&spec).await.unwrap();

        assert!(res.timed_out);
        assert_eq!(res.stdout, "fetched 2 of 5");
        assert!(res.stderr.starts_with("slow feed\n"), "{}", res.stderr);
        assert!(res.stderr.ends_with("timed out after 300ms and was killed"), "{}", res.stderr);
    }
}
