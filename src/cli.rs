// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `agentdev`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "agentdev",
    version,
    about = "Schedule generated-code tasks over a dependency DAG and apply their files safely.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "agentdev.toml")]
    pub config: String,

    /// Load tasks from a JSON task list instead of the `[task.*]` sections.
    ///
    /// The file may hold a bare array or a fenced code block.
    #[arg(long, value_name = "PATH")]
    pub tasks_json: Option<String>,

    /// Serve generated files from `<DIR>/<task id>/` (overrides `[generator]`).
    #[arg(long, value_name = "DIR")]
    pub staging: Option<String>,

    /// Compute diffs and report without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print tasks, the ready set and the critical path, then exit.
    #[arg(long)]
    pub plan: bool,

    /// Undo every change made under this work unit (task id), then exit.
    #[arg(long, value_name = "WORK_UNIT", conflicts_with = "plan")]
    pub rollback: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AGENTDEV_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
