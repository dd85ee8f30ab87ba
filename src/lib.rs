// src/lib.rs

pub mod artifact;
pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod history;
pub mod logging;
pub mod schedule;
pub mod server;
pub mod types;

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::artifact::OutputInspector;
use crate::cli::{CliArgs, Command};
use crate::config::{AppConfig, load_and_validate, save_to_path};
use crate::engine::{AppContext, SchedulerStart, ServerStart};
use crate::server::{local_ip, serve_url};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();

    match args.command {
        Command::Run { dry_run: true } => {
            let cfg = load_and_validate(&config_path)?;
            print_dry_run(&cfg);
            Ok(())
        }
        Command::Run { dry_run: false } => run_once(&config_path).await,
        Command::Serve { no_server } => serve(&config_path, !no_server).await,
        Command::Stats => {
            let cfg = load_and_validate(&config_path)?;
            let inspector = OutputInspector::new(&cfg.paths.artifact);
            let stats = inspector.stats()?;
            console::write_stats(&mut std::io::stdout(), inspector.path(), stats.as_ref())?;
            Ok(())
        }
        Command::Config { write } => {
            let cfg = load_and_validate(&config_path)?;
            print!("{}", toml::to_string_pretty(&cfg)?);
            if write {
                save_to_path(&config_path, &cfg)?;
                info!(config = ?config_path, "effective configuration written");
            }
            Ok(())
        }
    }
}

/// One manual run, printed to stdout.
async fn run_once(config_path: &Path) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    ctx.ensure_workspace_dirs()?;

    let report = ctx.run_now().await?;
    let mut stdout = std::io::stdout();
    console::write_report(&mut stdout, &report)?;
    stdout.flush()?;
    Ok(())
}

/// Long-running mode: scheduler, file server and the control console.
async fn serve(config_path: &Path, with_server: bool) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    ctx.ensure_workspace_dirs()?;

    match ctx.start_scheduler().await {
        SchedulerStart::Started(schedule) => info!(schedule = %schedule, "scheduled runs enabled"),
        SchedulerStart::AlreadyRunning(_) => {}
        SchedulerStart::Disabled => info!("scheduled runs disabled"),
    }

    if with_server {
        match ctx.start_server().await {
            Ok(ServerStart::Started(addr)) => {
                let file_name = ctx
                    .inspector()
                    .path()
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("feed available at {}", serve_url(local_ip(), addr.port(), &file_name));
            }
            Ok(ServerStart::AlreadyRunning(_)) => {}
            Err(e) => {
                ctx.shutdown().await;
                return Err(e.into());
            }
        }
    }

    let mut stdout = std::io::stdout();
    let outcome: Result<()> = tokio::select! {
        res = console::run_console(&ctx, console::stdin_lines(), &mut stdout) => {
            res.map_err(anyhow::Error::from)
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Ctrl-C received; shutting down"),
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
            Ok(())
        }
    };

    ctx.shutdown().await;
    debug!("serve loop finished");
    outcome
}

/// Simple dry-run output: stages, artifact and schedule.
fn print_dry_run(cfg: &AppConfig) {
    println!("feedpipe dry-run");
    println!("  artifact = {}", cfg.paths.artifact.display());
    println!("  static_root = {}", cfg.paths.static_root.display());
    println!("  schedule = {}", cfg.schedule());
    println!(
        "  server = {}:{} (stop_mode = {:?})",
        cfg.server.bind_address, cfg.server.port, cfg.server.stop_mode
    );
    println!();

    let stages = cfg.stage_specs();
    println!("stages ({}):", stages.len());
    for stage in &stages {
        println!("  - {}", stage.name);
        println!("      cmd: {}", stage.command_line());
        if let Some(timeout) = stage.timeout {
            println!("      timeout: {}s", timeout.as_secs());
        }
    }

    debug!("dry-run complete (no execution)");
}
