// src/console.rs

//! Interactive control commands for `feedpipe serve`.
//!
//! One command per line on stdin. Every command reports its outcome
//! synchronously on the output writer before the next line is read.

use std::io::{BufRead, Write};
use std::str::FromStr;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::artifact::ArtifactStats;
use crate::engine::{AppContext, SchedulerStart, ServerStart};
use crate::errors::{FeedpipeError, Result};
use crate::exec::PipelineReport;
use crate::schedule::ScheduleConfig;
use crate::server::{local_ip, serve_url};
use crate::types::ScheduleUnit;

pub const HELP: &str = "\
commands:
  run                         run the pipeline now
  server start | server stop  start or stop the file server
  status                      server, scheduler and run state
  jobs                        job history
  stats                       artifact item count
  schedule on | schedule off  enable or disable scheduled runs
  schedule <n> <unit>         run every n minutes|hours|days
  feeds                       loaded feed URLs
  config                      effective configuration
  save                        write configuration and feeds to disk
  help                        this text
  quit                        stop everything and exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Run,
    ServerStart,
    ServerStop,
    Status,
    Jobs,
    Stats,
    ScheduleOn,
    ScheduleOff,
    ScheduleEvery { interval: u32, unit: ScheduleUnit },
    Feeds,
    Config,
    Save,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        let cmd = match words.as_slice() {
            ["help"] | ["?"] => ConsoleCommand::Help,
            ["run"] => ConsoleCommand::Run,
            ["server", "start"] => ConsoleCommand::ServerStart,
            ["server", "stop"] => ConsoleCommand::ServerStop,
            ["status"] => ConsoleCommand::Status,
            ["jobs"] => ConsoleCommand::Jobs,
            ["stats"] => ConsoleCommand::Stats,
            ["schedule", "on"] => ConsoleCommand::ScheduleOn,
            ["schedule", "off"] => ConsoleCommand::ScheduleOff,
            ["schedule", interval, unit] => {
                let interval: u32 = interval
                    .parse()
                    .map_err(|_| format!("invalid interval: {interval}"))?;
                if interval == 0 {
                    return Err("interval must be at least 1".to_string());
                }
                ConsoleCommand::ScheduleEvery {
                    interval,
                    unit: unit.parse()?,
                }
            }
            ["feeds"] => ConsoleCommand::Feeds,
            ["config"] => ConsoleCommand::Config,
            ["save"] => ConsoleCommand::Save,
            ["quit"] | ["exit"] => ConsoleCommand::Quit,
            [] => return Err("empty command".to_string()),
            _ => return Err(format!("unknown command: {}", s.trim())),
        };
        Ok(cmd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Lines of stdin, read on a plain thread. The runtime does not wait for
/// that thread on exit, so a pending read never blocks shutdown.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Execute commands from `input` until `quit` or until the sender closes.
pub async fn run_console<W: Write>(
    ctx: &AppContext,
    mut input: mpsc::Receiver<String>,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "type `help` for commands")?;
    out.flush()?;

    while let Some(line) = input.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ConsoleCommand>() {
            Ok(cmd) => {
                debug!(?cmd, "console command");
                if execute(ctx, cmd, out).await? == Flow::Quit {
                    return Ok(());
                }
            }
            Err(msg) => writeln!(out, "error: {msg} (type `help`)")?,
        }
        out.flush()?;
    }

    debug!("console input closed");
    Ok(())
}

/// Run one command against the context and write its outcome.
///
/// Only output failures are returned; command failures are reported on
/// `out` as `error: ...` / `warning: ...` lines.
pub async fn execute<W: Write>(ctx: &AppContext, cmd: ConsoleCommand, out: &mut W) -> Result<Flow> {
    match cmd {
        ConsoleCommand::Help => writeln!(out, "{HELP}")?,
        ConsoleCommand::Run => match ctx.run_now().await {
            Ok(report) => write_report(out, &report)?,
            Err(FeedpipeError::RunInProgress) => {
                writeln!(out, "warning: run already in progress")?
            }
            Err(e) => writeln!(out, "error: {e}")?,
        },
        ConsoleCommand::ServerStart => match ctx.start_server().await {
            Ok(ServerStart::Started(addr)) => {
                let url = serve_url(local_ip(), addr.port(), &artifact_file_name(ctx));
                writeln!(out, "server started on {addr}; feed at {url}")?
            }
            Ok(ServerStart::AlreadyRunning(addr)) => {
                writeln!(out, "warning: server already running on {addr}")?
            }
            Err(e) => writeln!(out, "error: {e}")?,
        },
        ConsoleCommand::ServerStop => {
            if ctx.stop_server().await {
                writeln!(out, "server stopped")?
            } else {
                writeln!(out, "warning: server is not running")?
            }
        }
        ConsoleCommand::Status => write_status(ctx, out).await?,
        ConsoleCommand::Jobs => {
            let records = ctx.history().snapshot();
            if records.is_empty() {
                writeln!(out, "no jobs yet")?;
            }
            for record in records {
                writeln!(out, "{record}\n")?;
            }
        }
        ConsoleCommand::Stats => match ctx.inspector().stats() {
            Ok(stats) => write_stats(out, ctx.inspector().path(), stats.as_ref())?,
            Err(e) => writeln!(out, "error: {e}")?,
        },
        ConsoleCommand::ScheduleOn => {
            let schedule = ScheduleConfig {
                enabled: true,
                ..ctx.config().schedule()
            };
            apply_schedule(ctx, schedule, out).await?
        }
        ConsoleCommand::ScheduleOff => {
            let schedule = ScheduleConfig {
                enabled: false,
                ..ctx.config().schedule()
            };
            apply_schedule(ctx, schedule, out).await?
        }
        ConsoleCommand::ScheduleEvery { interval, unit } => {
            apply_schedule(ctx, ScheduleConfig::every(interval, unit), out).await?
        }
        ConsoleCommand::Feeds => {
            let feeds = ctx.feeds();
            writeln!(out, "{} feed(s)", feeds.len())?;
            for url in feeds.urls() {
                writeln!(out, "  {url}")?;
            }
        }
        ConsoleCommand::Config => match toml::to_string_pretty(&ctx.config()) {
            Ok(text) => write!(out, "# {}\n{text}", ctx.config_path().display())?,
            Err(e) => writeln!(out, "error: {e}")?,
        },
        ConsoleCommand::Save => match ctx.save_configuration() {
            Ok(()) => writeln!(out, "configuration and feeds saved")?,
            Err(e) => writeln!(out, "error: {e}")?,
        },
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

async fn apply_schedule<W: Write>(ctx: &AppContext, schedule: ScheduleConfig, out: &mut W) -> Result<()> {
    match ctx.update_schedule(schedule).await {
        Ok(SchedulerStart::Started(s)) => writeln!(out, "scheduler running {s}")?,
        Ok(SchedulerStart::AlreadyRunning(s)) => {
            warn!(schedule = %s, "scheduler was still tracked after reschedule");
            writeln!(out, "warning: scheduler already running {s}")?
        }
        Ok(SchedulerStart::Disabled) => writeln!(out, "scheduler stopped ({schedule})")?,
        Err(e) => writeln!(out, "error: {e}")?,
    }
    Ok(())
}

async fn write_status<W: Write>(ctx: &AppContext, out: &mut W) -> Result<()> {
    match ctx.lifecycle().server_addr().await {
        Some(addr) => writeln!(out, "server:    running on {addr}")?,
        None => writeln!(out, "server:    stopped")?,
    }
    match ctx.lifecycle().scheduler_config().await {
        Some(schedule) => writeln!(out, "scheduler: {schedule}")?,
        None => writeln!(out, "scheduler: stopped ({})", ctx.config().schedule())?,
    }
    let running = if ctx.executor().is_running() { "yes" } else { "no" };
    writeln!(out, "running:   {running}")?;
    writeln!(out, "jobs:      {}", ctx.history().len())?;
    Ok(())
}

/// Stage outputs, consolidated errors and the resulting job record.
pub fn write_report<W: Write>(out: &mut W, report: &PipelineReport) -> Result<()> {
    writeln!(out, "{}", report.consolidated_output())?;
    if !report.error_log.is_empty() {
        writeln!(out, "\n{}", report.consolidated_errors())?;
    }
    writeln!(out, "\n{}", report.record)?;
    Ok(())
}

pub fn write_stats<W: Write>(
    out: &mut W,
    path: &std::path::Path,
    stats: Option<&ArtifactStats>,
) -> Result<()> {
    match stats {
        Some(stats) => {
            writeln!(out, "Item count:   {}", stats.item_count)?;
            writeln!(
                out,
                "Last checked: {}",
                stats.last_checked.format("%Y-%m-%d %H:%M:%S")
            )?;
            writeln!(out, "Path:         {}", stats.path.display())?;
        }
        None => writeln!(out, "no artifact at {}", path.display())?,
    }
    Ok(())
}

fn artifact_file_name(ctx: &AppContext) -> String {
    ctx.inspector()
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
