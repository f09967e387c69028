// src/exec/host.rs

//! Launcher for Windows, built on `std::process::Command`.
//!
//! Signals do not exist on this host. `SIGINT`, `SIGTERM` and `SIGKILL` all
//! map to `TerminateProcess` (via `Child::kill`); anything else is rejected
//! with [`ProcessError::UnsupportedSignal`].

use std::io::{Read, Write};
use std::os::windows::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::errors::{ProcessError, Result, SystemError};
use crate::exec::launcher::{ChildHandle, Launcher, SpawnRequest, Spawned};
use crate::process::signals::{SIGINT, SIGKILL, SIGTERM};
use crate::types::ExitStatus;

const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Default, Clone, Copy)]
pub struct HostLauncher;

impl HostLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for HostLauncher {
    fn launch(&self, request: &SpawnRequest<'_>) -> Result<Spawned> {
        let args = request.arguments;

        let mut cmd = Command::new(request.executable);
        cmd.args(args.iter().skip(1))
            .env_clear()
            .envs(request.environment.iter())
            .stdin(Stdio::piped());

        if let Some(dir) = request.working_directory {
            cmd.current_dir(dir);
        }
        if request.start_new_process_group {
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        let mut merged_reader = None;
        if !request.capture_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else if request.merge_stderr {
            let (reader, writer) =
                std::io::pipe().map_err(|e| SystemError::from_io("CreatePipe", &e, args))?;
            let writer_clone = writer
                .try_clone()
                .map_err(|e| SystemError::from_io("DuplicateHandle", &e, args))?;
            cmd.stdout(writer).stderr(writer_clone);
            merged_reader = Some(reader);
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SystemError::from_io("CreateProcess", &e, args))?;
        // `cmd` still holds the write ends of a merged pipe.
        drop(cmd);

        let stdin = child.stdin.take().ok_or(ProcessError::StdinUnavailable)?;
        let stdout: Option<Box<dyn Read + Send>> = match merged_reader {
            Some(reader) => Some(Box::new(reader)),
            None => child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        };
        let stderr = child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>);

        let pid = child.id();
        debug!(pid, executable = %request.executable.display(), "CreateProcess succeeded");

        Ok(Spawned {
            child: Arc::new(HostChild {
                pid,
                child: Mutex::new(child),
                arguments: args.to_vec(),
            }),
            stdin: Box::new(stdin) as Box<dyn Write + Send>,
            stdout,
            stderr,
        })
    }
}

/// A child started by [`HostLauncher`].
#[derive(Debug)]
pub struct HostChild {
    pid: u32,
    child: Mutex<Child>,
    arguments: Vec<String>,
}

impl ChildHandle for HostChild {
    fn id(&self) -> u32 {
        self.pid
    }

    // Polls so that `signal` can take the lock while a waiter is blocked.
    fn wait(&self) -> Result<ExitStatus> {
        loop {
            let polled = self
                .child
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .try_wait()
                .map_err(|e| SystemError::from_io("WaitForSingleObject", &e, &self.arguments))?;
            if let Some(status) = polled {
                return Ok(map_exit_code(status.code().unwrap_or(-1)));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn signal(&self, signal: i32) -> Result<()> {
        if ![SIGINT, SIGTERM, SIGKILL].contains(&signal) {
            return Err(ProcessError::UnsupportedSignal(signal));
        }
        self.child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .kill()
            .map_err(|e| SystemError::from_io("TerminateProcess", &e, &self.arguments).into())
    }
}

/// Exit codes in the NTSTATUS error range mean the process died from an
/// unhandled exception.
fn map_exit_code(code: i32) -> ExitStatus {
    let raw = code as u32;
    if raw >= 0xC000_0000 {
        ExitStatus::Abnormal(raw)
    } else {
        ExitStatus::Terminated(code)
    }
}
