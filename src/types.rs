// src/types.rs

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::env::Environment;
use crate::errors::{ProcessError, Result};

/// How a child process terminated.
///
/// `Signalled` is only produced on POSIX hosts, `Abnormal` only on Windows
/// (where it carries the NTSTATUS exception code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    Terminated(i32),
    Signalled(i32),
    Abnormal(u32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Terminated(0))
    }

    /// Map a raw `waitpid` status word.
    #[cfg(unix)]
    pub fn from_wait_status(status: libc::c_int) -> Self {
        if libc::WIFSIGNALED(status) {
            ExitStatus::Signalled(libc::WTERMSIG(status))
        } else {
            ExitStatus::Terminated(libc::WEXITSTATUS(status))
        }
    }

    /// Exit code suitable for a wrapping binary (`128 + n` for signals).
    pub fn as_exit_code(&self) -> i32 {
        match *self {
            ExitStatus::Terminated(code) => code,
            ExitStatus::Signalled(signal) => 128 + signal,
            ExitStatus::Abnormal(_) => 1,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Terminated(code) => write!(f, "exit code {code}"),
            ExitStatus::Signalled(signal) => write!(f, "signal {signal}"),
            ExitStatus::Abnormal(code) => write!(f, "abnormal termination {code:#010x}"),
        }
    }
}

/// Which standard stream of the child a piece of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Callback invoked with every chunk read from a streamed pipe.
pub type OutputSink = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Callback invoked with the escaped command line right before spawning.
pub type LoggingHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// What to do with the child's stdout and stderr.
#[derive(Clone)]
pub enum OutputRedirection {
    /// Inherit the parent's streams.
    None,
    /// Buffer everything in memory.
    Collect { merge_stderr: bool },
    /// Hand every chunk to a sink; nothing is buffered.
    Stream {
        stdout: OutputSink,
        stderr: OutputSink,
        merge_stderr: bool,
    },
}

impl OutputRedirection {
    pub fn collect() -> Self {
        OutputRedirection::Collect { merge_stderr: false }
    }

    pub fn collect_merged() -> Self {
        OutputRedirection::Collect { merge_stderr: true }
    }

    pub fn stream(
        stdout: impl Fn(&[u8]) + Send + Sync + 'static,
        stderr: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> Self {
        OutputRedirection::Stream {
            stdout: Arc::new(stdout),
            stderr: Arc::new(stderr),
            merge_stderr: false,
        }
    }

    /// Stream chunks straight to this process's own stdout and stderr.
    pub fn forward_to_parent(merge_stderr: bool) -> Self {
        OutputRedirection::Stream {
            stdout: Arc::new(|chunk: &[u8]| {
                let _ = forward_chunk(StreamKind::Stdout, std::io::stdout().lock(), chunk);
            }),
            stderr: Arc::new(|chunk: &[u8]| {
                let _ = forward_chunk(StreamKind::Stderr, std::io::stderr().lock(), chunk);
            }),
            merge_stderr,
        }
    }

    pub fn redirects_output(&self) -> bool {
        !matches!(self, OutputRedirection::None)
    }

    pub fn merges_stderr(&self) -> bool {
        match self {
            OutputRedirection::None => false,
            OutputRedirection::Collect { merge_stderr } => *merge_stderr,
            OutputRedirection::Stream { merge_stderr, .. } => *merge_stderr,
        }
    }

    pub(crate) fn sink_for(&self, stream: StreamKind) -> Option<OutputSink> {
        match (self, stream) {
            (OutputRedirection::Stream { stdout, .. }, StreamKind::Stdout) => Some(stdout.clone()),
            (OutputRedirection::Stream { stderr, .. }, StreamKind::Stderr) => Some(stderr.clone()),
            _ => None,
        }
    }
}

impl Default for OutputRedirection {
    fn default() -> Self {
        OutputRedirection::collect()
    }
}

impl fmt::Debug for OutputRedirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputRedirection::None => f.write_str("None"),
            OutputRedirection::Collect { merge_stderr } => f
                .debug_struct("Collect")
                .field("merge_stderr", merge_stderr)
                .finish(),
            OutputRedirection::Stream { merge_stderr, .. } => f
                .debug_struct("Stream")
                .field("merge_stderr", merge_stderr)
                .finish_non_exhaustive(),
        }
    }
}

/// Write and flush one forwarded chunk, logging a failure.
///
/// The pump keeps draining after a failed write so the child never blocks on
/// a full pipe.
pub fn forward_chunk(stream: StreamKind, mut out: impl Write, chunk: &[u8]) -> std::io::Result<()> {
    out.write_all(chunk)
        .and_then(|()| out.flush())
        .inspect_err(|err| warn!(%stream, bytes = chunk.len(), error = %err, "forwarding child output failed"))
}

/// Output mode as named in job files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Inherit,
    #[default]
    Collect,
    Stream,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" | "none" => Ok(OutputMode::Inherit),
            "collect" => Ok(OutputMode::Collect),
            "stream" => Ok(OutputMode::Stream),
            other => Err(format!(
                "invalid output mode: {other} (expected \"inherit\", \"collect\" or \"stream\")"
            )),
        }
    }
}

/// Bytes captured from one stream, or the read error that ended the capture.
pub type StreamOutput = std::result::Result<Vec<u8>, ProcessError>;

/// Final, immutable outcome of a launched process.
///
/// Produced exactly once per process and shared by every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    arguments: Vec<String>,
    environment: Environment,
    exit_status: ExitStatus,
    output: StreamOutput,
    stderr_output: StreamOutput,
}

impl ProcessResult {
    pub fn new(
        arguments: Vec<String>,
        environment: Environment,
        exit_status: ExitStatus,
        output: StreamOutput,
        stderr_output: StreamOutput,
    ) -> Self {
        Self {
            arguments,
            environment,
            exit_status,
            output,
            stderr_output,
        }
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn exit_status(&self) -> ExitStatus {
        self.exit_status
    }

    pub fn output(&self) -> std::result::Result<&[u8], &ProcessError> {
        self.output.as_deref()
    }

    pub fn stderr_output(&self) -> std::result::Result<&[u8], &ProcessError> {
        self.stderr_output.as_deref()
    }

    /// Captured stdout decoded as UTF-8.
    pub fn utf8_output(&self) -> Result<String> {
        decode_utf8(&self.output)
    }

    /// Captured stderr decoded as UTF-8.
    pub fn utf8_stderr_output(&self) -> Result<String> {
        decode_utf8(&self.stderr_output)
    }
}

fn decode_utf8(output: &StreamOutput) -> Result<String> {
    let bytes = output.as_ref().map_err(Clone::clone)?;
    String::from_utf8(bytes.clone()).map_err(|_| ProcessError::IllegalUtf8Sequence)
}
