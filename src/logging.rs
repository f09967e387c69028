// src/logging.rs

//! `tracing` setup for the `procexec` binary.
//!
//! The level comes from `--log-level`, else from `PROCEXEC_LOG`, else `warn`.
//! `PROCEXEC_LOG` may also hold a full `EnvFilter` directive such as
//! `procexec::exec=trace,procexec=info`.
//!
//! Everything is written to stderr: in `collect` and `stream` mode the
//! binary's stdout carries the child's output.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "PROCEXEC_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

/// Filter for the given flag and environment value.
///
/// A bare level in the environment applies to this crate only, so that
/// dependencies stay quiet.
pub fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(crate_filter(Level::from(level)));
    }
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(crate_filter(Level::WARN)),
        Some(value) => match parse_level_str(value) {
            Some(level) => Ok(crate_filter(level)),
            None => EnvFilter::try_new(value)
                .with_context(|| format!("invalid {LOG_ENV_VAR} value '{value}'")),
        },
    }
}

fn crate_filter(level: Level) -> EnvFilter {
    EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME")))
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
