// src/exec/stage.rs

use std::path::PathBuf;
use std::time::Duration;

/// Placeholder reported when a stage wrote nothing to stdout.
pub const NO_OUTPUT: &str = "No output";
/// Placeholder reported when a stage wrote nothing to stderr.
pub const NO_ERRORS: &str = "No errors";

/// One pipeline stage: a name and the program invocation behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl StageSpec {
    pub fn new(name: &str, program: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args,
            working_dir: None,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Human-readable command line, for logs and dry runs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured outcome of running one stage.
///
/// A non-zero exit is data, not an error: the pipeline decides what to do
/// with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; `None` if killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl StageResult {
    /// Build a result from raw captured streams, trimming them and
    /// substituting the placeholders for empty streams.
    pub fn from_streams(stdout: &str, stderr: &str, exit_code: Option<i32>, elapsed: Duration) -> Self {
        Self {
            stdout: or_placeholder(stdout, NO_OUTPUT),
            stderr: or_placeholder(stderr, NO_ERRORS),
            exit_code,
            timed_out: false,
            elapsed,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// True when the stage wrote anything to stderr.
    pub fn has_errors(&self) -> bool {
        self.stderr != NO_ERRORS && !self.stderr.trim().is_empty()
    }
}

fn or_placeholder(stream: &str, placeholder: &str) -> String {
    let trimmed = stream.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}
