// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unit of the recurring schedule (`scheduling_period` in the config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleUnit {
    Minutes,
    Hours,
    Days,
}

impl ScheduleUnit {
    pub fn as_secs(self) -> u64 {
        match self {
            ScheduleUnit::Minutes => 60,
            ScheduleUnit::Hours => 60 * 60,
            ScheduleUnit::Days => 24 * 60 * 60,
        }
    }

    /// Length of `count` units.
    pub fn duration(self, count: u32) -> Duration {
        Duration::from_secs(self.as_secs() * u64::from(count))
    }
}

impl Default for ScheduleUnit {
    fn default() -> Self {
        ScheduleUnit::Minutes
    }
}

impl fmt::Display for ScheduleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleUnit::Minutes => "minutes",
            ScheduleUnit::Hours => "hours",
            ScheduleUnit::Days => "days",
        };
        f.write_str(s)
    }
}

impl FromStr for ScheduleUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "minutes" | "m" => Ok(ScheduleUnit::Minutes),
            "hour" | "hours" | "h" => Ok(ScheduleUnit::Hours),
            "day" | "days" | "d" => Ok(ScheduleUnit::Days),
            other => Err(format!(
                "invalid scheduling period: {other} (expected \"minutes\", \"hours\" or \"days\")"
            )),
        }
    }
}

/// Language-model provider the rewrite stage talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ApiProvider {
    OpenAI,
    Groq,
    Ollama,
}

impl Default for ApiProvider {
    fn default() -> Self {
        ApiProvider::OpenAI
    }
}

/// How the file server is stopped.
///
/// - `Hard`: signal graceful shutdown, wait up to the grace period, then abort
///   the accept loop. The port is free once `stop` returns.
/// - `Soft`: forget the handle and leave the listener running until the
///   process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMode {
    Hard,
    Soft,
}

impl Default for StopMode {
    fn default() -> Self {
        StopMode::Hard
    }
}
