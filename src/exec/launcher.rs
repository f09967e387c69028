// src/exec/launcher.rs

//! Pluggable spawn strategy.
//!
//! [`Process`](crate::process::Process) talks to a [`Launcher`] instead of a
//! native API. Exactly one real implementation is compiled per target and
//! exported as [`PlatformLauncher`]:
//!
//! - [`PosixLauncher`](crate::exec::posix::PosixLauncher) on unix hosts,
//!   built on `posix_spawn`.
//! - [`HostLauncher`](crate::exec::host::HostLauncher) on Windows, built on
//!   the standard library's process API.
//!
//! Tests can supply their own launcher that never touches the OS.

use std::fmt::Debug;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::env::Environment;
use crate::errors::Result;
use crate::types::ExitStatus;

/// Everything a launcher needs to start one child.
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest<'a> {
    /// Resolved, absolute path of the program.
    pub executable: &'a Path,
    /// Full argument vector; the first element is the program token as the
    /// caller wrote it.
    pub arguments: &'a [String],
    pub environment: &'a Environment,
    pub working_directory: Option<&'a Path>,
    /// Pipe stdout (and stderr) back to the parent instead of inheriting.
    pub capture_output: bool,
    /// Send stderr down the stdout pipe. Only meaningful with capture.
    pub merge_stderr: bool,
    pub start_new_process_group: bool,
}

/// A live child plus the parent-side ends of its pipes.
///
/// `stdout` is `None` when output is inherited. `stderr` is additionally
/// `None` when it is merged into stdout.
pub struct Spawned {
    pub child: Arc<dyn ChildHandle>,
    pub stdin: Box<dyn Write + Send>,
    pub stdout: Option<Box<dyn Read + Send>>,
    pub stderr: Option<Box<dyn Read + Send>>,
}

/// Native handle of a running child.
pub trait ChildHandle: Send + Sync + Debug {
    /// OS process identifier.
    fn id(&self) -> u32;

    /// Block until the child terminates and reap it.
    ///
    /// Called at most once per child by the completion state machine.
    fn wait(&self) -> Result<ExitStatus>;

    /// Deliver `signal` to the child, or to its whole process group when it
    /// was started in a new one.
    fn signal(&self, signal: i32) -> Result<()>;
}

/// Trait abstracting how children are spawned.
pub trait Launcher: Send + Sync + Debug {
    fn launch(&self, request: &SpawnRequest<'_>) -> Result<Spawned>;
}

#[cfg(unix)]
pub type PlatformLauncher = crate::exec::posix::PosixLauncher;

#[cfg(windows)]
pub type PlatformLauncher = crate::exec::host::HostLauncher;
