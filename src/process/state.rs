// src/process/state.rs

//! Completion state machine.
//!
//! One [`Completion`] is shared by a process, its output pumps and every
//! waiter. Transitions only move forward:
//!
//! ```text
//! Idle -> Launching -> Draining -> Drained -> Reaping -> Reaped
//!            |                                      \-> Failed
//!            \-> Idle (launch failed)
//! ```
//!
//! The first waiter to observe `Drained` marks the state `Reaping` and reaps
//! the child with the lock released; everyone else blocks on the condition
//! variable and then reads the stored terminal value. The lock is never held
//! across a blocking call, so `phase` and `try_result` return promptly.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::errors::{ProcessError, Result};
use crate::types::{ProcessResult, StreamKind, StreamOutput};

#[derive(Debug)]
enum CompletionState {
    Idle,
    Launching,
    Draining {
        pending: usize,
        stdout: Option<StreamOutput>,
        stderr: Option<StreamOutput>,
    },
    Drained {
        stdout: StreamOutput,
        stderr: StreamOutput,
    },
    Reaping,
    Reaped(ProcessResult),
    Failed(ProcessError),
}

/// Coarse view of the completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPhase {
    Idle,
    Launching,
    Draining,
    Drained,
    Reaping,
    Reaped,
    Failed,
}

#[derive(Debug)]
pub(crate) struct Completion {
    state: Mutex<CompletionState>,
    changed: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(CompletionState::Idle),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CompletionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn phase(&self) -> CompletionPhase {
        match *self.lock() {
            CompletionState::Idle => CompletionPhase::Idle,
            CompletionState::Launching => CompletionPhase::Launching,
            CompletionState::Draining { .. } => CompletionPhase::Draining,
            CompletionState::Drained { .. } => CompletionPhase::Drained,
            CompletionState::Reaping => CompletionPhase::Reaping,
            CompletionState::Reaped(_) => CompletionPhase::Reaped,
            CompletionState::Failed(_) => CompletionPhase::Failed,
        }
    }

    /// Mark a launch as in progress. Waiters arriving now block until it
    /// either succeeds or is abandoned.
    pub(crate) fn begin_launch(&self) {
        let mut state = self.lock();
        if matches!(*state, CompletionState::Idle) {
            *state = CompletionState::Launching;
        }
    }

    /// The launch failed: back to `Idle`, waking anyone who queued up.
    pub(crate) fn abandon_launch(&self) {
        let mut state = self.lock();
        if matches!(*state, CompletionState::Launching) {
            *state = CompletionState::Idle;
            self.changed.notify_all();
        }
    }

    /// Start draining, expecting `pending` pumps to report in. With no pumps
    /// the state is immediately `Drained` with empty output on both streams.
    pub(crate) fn begin_draining(&self, pending: usize) {
        let mut state = self.lock();
        if !matches!(*state, CompletionState::Idle | CompletionState::Launching) {
            warn!("begin_draining called twice; ignoring");
            return;
        }
        *state = if pending == 0 {
            CompletionState::Drained {
                stdout: Ok(Vec::new()),
                stderr: Ok(Vec::new()),
            }
        } else {
            CompletionState::Draining {
                pending,
                stdout: None,
                stderr: None,
            }
        };
        self.changed.notify_all();
    }

    /// Record one pump's result. The last pump moves the state to `Drained`.
    pub(crate) fn stream_finished(&self, stream: StreamKind, output: StreamOutput) {
        let mut state = self.lock();
        let CompletionState::Draining {
            pending,
            stdout,
            stderr,
        } = &mut *state
        else {
            warn!(%stream, "stream finished outside of draining; dropping result");
            return;
        };

        match stream {
            StreamKind::Stdout => *stdout = Some(output),
            StreamKind::Stderr => *stderr = Some(output),
        }
        *pending = pending.saturating_sub(1);

        if *pending == 0 {
            // A stream without a pump (merged stderr) drains as empty success.
            let stdout = stdout.take().unwrap_or_else(|| Ok(Vec::new()));
            let stderr = stderr.take().unwrap_or_else(|| Ok(Vec::new()));
            *state = CompletionState::Drained { stdout, stderr };
            debug!("all output pumps drained");
            self.changed.notify_all();
        }
    }

    /// The terminal value, if one has been stored.
    pub(crate) fn try_result(&self) -> Option<Result<ProcessResult>> {
        match &*self.lock() {
            CompletionState::Reaped(result) => Some(Ok(result.clone())),
            CompletionState::Failed(err) => Some(Err(err.clone())),
            _ => None,
        }
    }

    /// Block until a terminal value exists, producing it with `reap` if this
    /// caller is the first to find the pumps drained.
    pub(crate) fn wait<F>(&self, reap: F) -> Result<ProcessResult>
    where
        F: FnOnce(StreamOutput, StreamOutput) -> Result<ProcessResult>,
    {
        let mut state = self.lock();
        loop {
            match std::mem::replace(&mut *state, CompletionState::Reaping) {
                CompletionState::Idle => {
                    *state = CompletionState::Idle;
                    return Err(ProcessError::NotLaunched);
                }
                CompletionState::Drained { stdout, stderr } => {
                    // `Reaping` is already installed; reap without the lock.
                    drop(state);
                    let outcome = reap(stdout, stderr);

                    let mut state = self.lock();
                    *state = match &outcome {
                        Ok(result) => CompletionState::Reaped(result.clone()),
                        Err(err) => CompletionState::Failed(err.clone()),
                    };
                    self.changed.notify_all();
                    return outcome;
                }
                CompletionState::Reaped(result) => {
                    *state = CompletionState::Reaped(result.clone());
                    return Ok(result);
                }
                CompletionState::Failed(err) => {
                    *state = CompletionState::Failed(err.clone());
                    return Err(err);
                }
                pending @ (CompletionState::Launching
                | CompletionState::Draining { .. }
                | CompletionState::Reaping) => {
                    *state = pending;
                    state = self
                        .changed
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}
