// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::OutputMode;

/// Command-line arguments for `procexec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procexec",
    version,
    about = "Run a command, drain its output safely and report how it exited.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a job file (TOML) describing the launch.
    ///
    /// Mutually exclusive with a command given after `--`.
    #[arg(long, value_name = "PATH", conflicts_with = "command")]
    pub config: Option<String>,

    /// Working directory for the child.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// What to do with the child's output (inherit, collect, stream).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<OutputMode>,

    /// Send the child's stderr down its stdout pipe.
    #[arg(long)]
    pub merge_stderr: bool,

    /// Keep the child in this process's process group.
    #[arg(long)]
    pub no_new_process_group: bool,

    /// Treat a nonzero exit as an error.
    #[arg(long)]
    pub check: bool,

    /// Print where NAME resolves to and exit without running anything.
    #[arg(long, value_name = "NAME")]
    pub which: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCEXEC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Program and arguments to run.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
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
