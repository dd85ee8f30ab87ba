use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use feedpipe::errors::{FeedpipeError, Result};
use feedpipe::exec::{StageBackend, StageResult, StageSpec};
use tokio::sync::Semaphore;

use crate::write_feed;

/// What a scripted stage does when run.
#[derive(Debug, Clone)]
pub enum StageScript {
    /// The stage "ran" and produced these streams.
    Finished {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    /// The stage could not be launched.
    SpawnFailure,
}

impl StageScript {
    pub fn ok(stdout: &str) -> Self {
        StageScript::Finished {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn exits(code: i32, stderr: &str) -> Self {
        StageScript::Finished {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(code),
        }
    }
}

struct ArtifactWrites {
    path: PathBuf,
    counts: Mutex<VecDeque<usize>>,
}

/// A fake stage backend that:
/// - records which stages were "run", in order
/// - answers with a scripted result per stage name (default: success)
/// - optionally rewrites the artifact with the next item count from a queue
///   (the last count repeats once the queue is drained)
/// - optionally parks a stage until a permit is added to its gate
/// - optionally sleeps on every stage (useful under paused time)
#[derive(Default)]
pub struct ScriptedStages {
    scripts: HashMap<String, StageScript>,
    artifact: HashMap<String, ArtifactWrites>,
    gates: HashMap<String, Arc<Semaphore>>,
    delay: Option<Duration>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, stage: &str, script: StageScript) -> Self {
        self.scripts.insert(stage.to_string(), script);
        self
    }

    pub fn writes_artifact(mut self, stage: &str, path: impl Into<PathBuf>, counts: Vec<usize>) -> Self {
        self.artifact.insert(
            stage.to_string(),
            ArtifactWrites {
                path: path.into(),
                counts: Mutex::new(counts.into()),
            },
        );
        self
    }

    /// Park `stage` until a permit is available on `gate`. Each run of the
    /// stage consumes one permit; release runs with `gate.add_permits(n)`.
    pub fn gate(mut self, stage: &str, gate: Arc<Semaphore>) -> Self {
        self.gates.insert(stage.to_string(), gate);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared list of executed stage names.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

impl StageBackend for ScriptedStages {
    fn run<'a>(
        &'a self,
        stage: &'a StageSpec,
    ) -> Pin<Box<dyn Future<Output = Result<StageResult>> + Send + 'a>> {
        Box::pin(async move {
            {
                let mut guard = self.executed.lock().unwrap();
                guard.push(stage.name.clone());
            }

            if let Some(gate) = self.gates.get(&stage.name) {
                gate.acquire().await.unwrap().forget();
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(writes) = self.artifact.get(&stage.name) {
                let count = {
                    let mut counts = writes.counts.lock().unwrap();
                    if counts.len() > 1 {
                        counts.pop_front()
                    } else {
                        counts.front().copied()
                    }
                };
                if let Some(count) = count {
                    write_feed(&writes.path, count);
                }
            }

            match self.scripts.get(&stage.name) {
                Some(StageScript::SpawnFailure) => Err(FeedpipeError::StageSpawn {
                    stage: stage.name.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "scripted spawn failure",
                    ),
                }),
                Some(StageScript::Finished {
                    stdout,
                    stderr,
                    exit_code,
                }) => Ok(StageResult::from_streams(
                    stdout,
                    stderr,
                    *exit_code,
                    Duration::ZERO,
                )),
                None => Ok(StageResult::from_streams(
                    &format!("{} done", stage.name),
                    "",
                    Some(0),
                    Duration::ZERO,
                )),
            }
        })
    }
}
