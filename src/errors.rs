// src/errors.rs

//! Crate-wide error types.
//!
//! [`ProcessError`] covers everything the engine can report. It is `Clone`
//! because a terminal failure is stored once and handed to every waiter, and
//! because per-stream read failures live inside a [`ProcessResult`].
//!
//! [`ConfigError`] covers loading job files from disk.

use std::fmt;

use thiserror::Error;

use crate::process::escape::{escape_command_line, strip_sandbox_wrapper};
use crate::types::{ProcessResult, StreamKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("could not find executable for '{0}'")]
    MissingExecutableProgram(String),

    #[error("changing the working directory is not supported when spawning on this platform")]
    WorkingDirectoryNotSupported,

    #[error("could not open stdin of the child process")]
    StdinUnavailable,

    #[error(transparent)]
    System(#[from] SystemError),

    #[error("reading {stream} of the child process failed with error {code} ({message})")]
    Read {
        stream: StreamKind,
        code: i32,
        message: String,
    },

    #[error("{}", render_non_zero_exit(.0))]
    NonZeroExit(Box<ProcessResult>),

    #[error("captured output is not valid UTF-8")]
    IllegalUtf8Sequence,

    #[error("process has already been launched")]
    AlreadyLaunched,

    #[error("process has not been launched")]
    NotLaunched,

    #[error("argument vector is empty; the first element must name the program")]
    EmptyArguments,

    #[error("argument contains an interior NUL byte: {0:?}")]
    InteriorNul(String),

    #[error("signal {0} cannot be delivered on this platform")]
    UnsupportedSignal(i32),
}

impl ProcessError {
    /// Build a read error from the `io::Error` a pump observed.
    pub(crate) fn read(stream: StreamKind, err: &std::io::Error) -> Self {
        ProcessError::Read {
            stream,
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }
}

/// A failed native call made while spawning, waiting on, or signalling a
/// child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemError {
    /// Name of the originating call, e.g. `posix_spawn` or `waitpid`.
    pub call: &'static str,
    /// Raw OS error code (errno on POSIX).
    pub code: i32,
    /// Full argument vector of the process involved.
    pub arguments: Vec<String>,
}

impl SystemError {
    pub fn new(call: &'static str, code: i32, arguments: &[String]) -> Self {
        Self {
            call,
            code,
            arguments: arguments.to_vec(),
        }
    }

    /// Capture the calling thread's last OS error.
    pub fn last_os_error(call: &'static str, arguments: &[String]) -> Self {
        let code = std::io::Error::last_os_error().raw_os_error().unwrap_or(-1);
        Self::new(call, code, arguments)
    }

    pub fn from_io(call: &'static str, err: &std::io::Error, arguments: &[String]) -> Self {
        Self::new(call, err.raw_os_error().unwrap_or(-1), arguments)
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = std::io::Error::from_raw_os_error(self.code);
        write!(f, "{} failed with error {} ({message})", self.call, self.code)?;
        if !self.arguments.is_empty() {
            write!(f, " while running: {}", escape_command_line(&self.arguments))?;
        }
        Ok(())
    }
}

impl std::error::Error for SystemError {}

fn render_non_zero_exit(result: &ProcessResult) -> String {
    let command = escape_command_line(strip_sandbox_wrapper(result.arguments()));
    let mut message = format!("process exited with {}: {command}", result.exit_status());

    let mut combined = Vec::new();
    if let Ok(stdout) = result.output() {
        combined.extend_from_slice(stdout);
    }
    if let Ok(stderr) = result.stderr_output() {
        combined.extend_from_slice(stderr);
    }

    let combined = String::from_utf8_lossy(&combined);
    let combined = combined.trim_end();
    if !combined.is_empty() {
        message.push_str("\n    output:");
        for line in combined.lines() {
            message.push_str("\n    ");
            message.push_str(line);
        }
    }
    message
}

/// Errors raised while loading a job file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
