// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `feedpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "feedpipe",
    version,
    about = "Run the feed aggregation pipeline, on demand or on a schedule, and serve its output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file means "all defaults".
    #[arg(long, global = true, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FEEDPIPE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the pipeline once and print the stage outputs and the job record.
    Run {
        /// Print the configured stages without running them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the scheduler (if enabled) and the file server, then accept
    /// console commands on stdin until `quit` or Ctrl-C.
    Serve {
        /// Don't start the file server at startup.
        #[arg(long)]
        no_server: bool,
    },

    /// Print item count and path of the current artifact.
    Stats,

    /// Print the effective configuration (defaults filled in).
    Config {
        /// Write the effective configuration back to the config file.
        #[arg(long)]
        write: bool,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
