// src/process/mod.rs

//! The process handle.
//!
//! A [`Process`] is configured once through [`ProcessBuilder`], launched at
//! most once, and then waited on by any number of callers, blocking
//! ([`Process::wait`]) or suspending ([`Process::wait_async`]). All waiters
//! observe the same [`ProcessResult`], produced after both output pumps have
//! drained and the child has been reaped exactly once.
//!
//! Cloning a `Process` is cheap and yields another handle to the same child.

pub mod escape;
pub mod signals;
pub mod state;

use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::env::Environment;
use crate::errors::{ProcessError, Result, SystemError};
use crate::exec::pump::spawn_pump;
use crate::exec::{ChildHandle, Launcher, PlatformLauncher, SpawnRequest, Spawned};
use crate::resolve::ExecutableResolver;
use crate::types::{LoggingHandler, OutputRedirection, ProcessResult, StreamKind};

use self::escape::escape_command_line;
use self::state::Completion;

pub use self::state::CompletionPhase;

/// Launch configuration for a [`Process`].
#[derive(Clone)]
pub struct ProcessBuilder {
    arguments: Vec<String>,
    environment: Environment,
    working_directory: Option<PathBuf>,
    output_redirection: OutputRedirection,
    start_new_process_group: bool,
    logging_handler: Option<LoggingHandler>,
    resolver: Option<Arc<ExecutableResolver>>,
    launcher: Option<Arc<dyn Launcher>>,
}

impl ProcessBuilder {
    /// Start from an argument vector whose first element names the program.
    ///
    /// Defaults: the caller's environment, no working directory change,
    /// collected output, a new process group, no logging handler, and the
    /// process-wide resolver.
    pub fn new<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            environment: Environment::current(),
            working_directory: None,
            output_redirection: OutputRedirection::default(),
            start_new_process_group: true,
            logging_handler: None,
            resolver: None,
            launcher: None,
        }
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn output_redirection(mut self, redirection: OutputRedirection) -> Self {
        self.output_redirection = redirection;
        self
    }

    pub fn start_new_process_group(mut self, enabled: bool) -> Self {
        self.start_new_process_group = enabled;
        self
    }

    /// Called with the escaped command line right before spawning.
    pub fn logging_handler(mut self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.logging_handler = Some(Arc::new(handler));
        self
    }

    /// Use `resolver` instead of the process-wide [`ExecutableResolver::shared`].
    pub fn resolver(mut self, resolver: Arc<ExecutableResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the platform launcher, e.g. with a scripted one in tests.
    pub fn launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn build(self) -> Process {
        Process {
            inner: Arc::new(ProcessInner {
                arguments: self.arguments,
                environment: self.environment,
                working_directory: self.working_directory,
                output_redirection: self.output_redirection,
                start_new_process_group: self.start_new_process_group,
                logging_handler: self.logging_handler,
                resolver: self.resolver.unwrap_or_else(ExecutableResolver::shared),
                launcher: self
                    .launcher
                    .unwrap_or_else(|| Arc::new(PlatformLauncher::default())),
                launch_attempted: Mutex::new(false),
                child: Mutex::new(None),
                completion: Arc::new(Completion::new()),
            }),
        }
    }
}

impl fmt::Debug for ProcessBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessBuilder")
            .field("arguments", &self.arguments)
            .field("working_directory", &self.working_directory)
            .field("output_redirection", &self.output_redirection)
            .field("start_new_process_group", &self.start_new_process_group)
            .finish_non_exhaustive()
    }
}

struct ProcessInner {
    arguments: Vec<String>,
    environment: Environment,
    working_directory: Option<PathBuf>,
    output_redirection: OutputRedirection,
    start_new_process_group: bool,
    logging_handler: Option<LoggingHandler>,
    resolver: Arc<ExecutableResolver>,
    launcher: Arc<dyn Launcher>,
    /// Single-shot guard, independent of the completion lock.
    launch_attempted: Mutex<bool>,
    child: Mutex<Option<Arc<dyn ChildHandle>>>,
    completion: Arc<Completion>,
}

/// Handle to one child process.
#[derive(Clone)]
pub struct Process {
    inner: Arc<ProcessInner>,
}

impl Process {
    /// Process with default settings; see [`ProcessBuilder::new`].
    pub fn new<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessBuilder::new(arguments).build()
    }

    pub fn builder<I, S>(arguments: I) -> ProcessBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessBuilder::new(arguments)
    }

    pub fn arguments(&self) -> &[String] {
        &self.inner.arguments
    }

    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.inner.working_directory.as_deref()
    }

    pub fn output_redirection(&self) -> &OutputRedirection {
        &self.inner.output_redirection
    }

    /// Resolver used to find the program at launch.
    pub fn resolver(&self) -> &Arc<ExecutableResolver> {
        &self.inner.resolver
    }

    /// OS identifier of the child, once it has been spawned.
    pub fn pid(&self) -> Option<u32> {
        self.child().map(|child| child.id())
    }

    /// `true` once a child has actually been spawned.
    pub fn is_launched(&self) -> bool {
        self.child().is_some()
    }

    pub fn phase(&self) -> CompletionPhase {
        self.inner.completion.phase()
    }

    /// Spawn the child and start draining its output.
    ///
    /// May be called once. A second call fails with
    /// [`ProcessError::AlreadyLaunched`] even if the first one failed; a
    /// failed launch leaves the process unlaunched and inert.
    pub fn launch(&self) -> Result<ProcessStdin> {
        {
            let mut attempted = self
                .inner
                .launch_attempted
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *attempted {
                return Err(ProcessError::AlreadyLaunched);
            }
            *attempted = true;
        }
        self.inner.completion.begin_launch();

        let spawned = self.spawn().inspect_err(|err| {
            warn!(command = %escape_command_line(&self.inner.arguments), error = %err, "launch failed");
            self.inner.completion.abandon_launch();
        })?;

        let Spawned {
            child,
            stdin,
            stdout,
            stderr,
        } = spawned;

        info!(
            pid = child.id(),
            command = %escape_command_line(&self.inner.arguments),
            "launched process"
        );
        *self.inner.child.lock().unwrap_or_else(PoisonError::into_inner) = Some(child);

        let readers: Vec<(StreamKind, Box<dyn Read + Send>)> = [
            (StreamKind::Stdout, stdout),
            (StreamKind::Stderr, stderr),
        ]
        .into_iter()
        .filter_map(|(kind, reader)| reader.map(|r| (kind, r)))
        .collect();

        self.inner.completion.begin_draining(readers.len());
        for (kind, reader) in readers {
            let sink = self.inner.output_redirection.sink_for(kind);
            spawn_pump(kind, reader, sink, Arc::clone(&self.inner.completion));
        }

        Ok(ProcessStdin::new(stdin))
    }

    fn spawn(&self) -> Result<Spawned> {
        let inner = &self.inner;
        let program = inner.arguments.first().ok_or(ProcessError::EmptyArguments)?;

        let executable = inner
            .resolver
            .resolve(program, inner.working_directory.as_deref())
            .ok_or_else(|| ProcessError::MissingExecutableProgram(program.clone()))?;
        debug!(program = %program, executable = %executable.display(), "resolved executable");

        if let Some(handler) = &inner.logging_handler {
            handler(&escape_command_line(&inner.arguments));
        }

        let request = SpawnRequest {
            executable: &executable,
            arguments: &inner.arguments,
            environment: &inner.environment,
            working_directory: inner.working_directory.as_deref(),
            capture_output: inner.output_redirection.redirects_output(),
            merge_stderr: inner.output_redirection.merges_stderr(),
            start_new_process_group: inner.start_new_process_group,
        };
        inner.launcher.launch(&request)
    }

    /// Block until output is drained and the child is reaped.
    ///
    /// Callable any number of times, from any number of threads; every call
    /// returns the same result. Nonzero exit is not an error here.
    pub fn wait(&self) -> Result<ProcessResult> {
        self.inner.completion.wait(|stdout, stderr| {
            let child = self.child().ok_or(ProcessError::NotLaunched)?;
            let exit_status = child.wait().inspect_err(|err| {
                warn!(pid = child.id(), error = %err, "reaping child failed");
            })?;
            info!(pid = child.id(), %exit_status, "reaped process");

            Ok(ProcessResult::new(
                self.inner.arguments.clone(),
                self.inner.environment.clone(),
                exit_status,
                stdout,
                stderr,
            ))
        })
    }

    /// Suspending form of [`wait`](Self::wait).
    ///
    /// Runs the blocking wait on a dedicated thread and resumes through a
    /// one-shot channel, so it never blocks the executor and works outside a
    /// Tokio runtime too. The fast path only peeks at the completion state,
    /// whose lock is never held across a reap.
    pub async fn wait_async(&self) -> Result<ProcessResult> {
        if let Some(done) = self.inner.completion.try_result() {
            return done;
        }

        let (tx, rx) = oneshot::channel();
        let process = self.clone();
        std::thread::Builder::new()
            .name("procexec-wait".to_string())
            .spawn(move || {
                let _ = tx.send(process.wait());
            })
            .map_err(|err| SystemError::from_io("spawn waiter thread", &err, &self.inner.arguments))?;

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(SystemError::new("wait", -1, &self.inner.arguments).into()),
        }
    }

    /// Send `signal` to the child, or to its process group when it was
    /// started in a new one.
    pub fn signal(&self, signal: i32) -> Result<()> {
        let child = self.child().ok_or(ProcessError::NotLaunched)?;
        info!(pid = child.id(), signal, "signalling process");
        child.signal(signal)
    }

    fn child(&self) -> Option<Arc<dyn ChildHandle>> {
        self.inner
            .child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("arguments", &self.inner.arguments)
            .field("pid", &self.pid())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Write end of the child's stdin.
///
/// Dropping it, or calling [`close`](Self::close), signals EOF to the child.
pub struct ProcessStdin {
    writer: Option<Box<dyn Write + Send>>,
}

impl ProcessStdin {
    pub(crate) fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    pub fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    fn writer(&mut self) -> io::Result<&mut Box<dyn Write + Send>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin already closed"))
    }
}

impl Write for ProcessStdin {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl fmt::Debug for ProcessStdin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessStdin")
            .field("closed", &self.is_closed())
            .finish()
    }
}
