// src/run.rs

//! Convenience wrappers around [`Process`].

use std::path::{Path, PathBuf};

use crate::env::Environment;
use crate::errors::{ProcessError, Result};
use crate::process::{Process, ProcessBuilder};
use crate::resolve::ExecutableResolver;
use crate::types::{OutputRedirection, ProcessResult};

/// Launch `builder`, close stdin immediately and wait for the result.
pub fn run_process(builder: ProcessBuilder) -> Result<ProcessResult> {
    let process = builder.build();
    drop(process.launch()?);
    process.wait()
}

/// Suspending form of [`run_process`].
pub async fn run_process_async(builder: ProcessBuilder) -> Result<ProcessResult> {
    let process = builder.build();
    drop(process.launch()?);
    process.wait_async().await
}

/// Run `arguments` with `environment`, collecting stdout and stderr.
pub fn run_and_collect<S: AsRef<str>>(arguments: &[S], environment: Environment) -> Result<ProcessResult> {
    run_process(collecting(arguments, environment))
}

pub async fn run_and_collect_async<S: AsRef<str>>(
    arguments: &[S],
    environment: Environment,
) -> Result<ProcessResult> {
    run_process_async(collecting(arguments, environment)).await
}

/// Like [`run_and_collect`], but a nonzero exit is an error and stdout is
/// returned as text.
pub fn checked_output<S: AsRef<str>>(arguments: &[S], environment: Environment) -> Result<String> {
    check_result(run_and_collect(arguments, environment)?)
}

pub async fn checked_output_async<S: AsRef<str>>(
    arguments: &[S],
    environment: Environment,
) -> Result<String> {
    check_result(run_and_collect_async(arguments, environment).await?)
}

/// Fail with [`ProcessError::NonZeroExit`] unless the process exited with
/// code 0; otherwise decode its stdout.
pub fn check_result(result: ProcessResult) -> Result<String> {
    if !result.exit_status().success() {
        return Err(ProcessError::NonZeroExit(Box::new(result)));
    }
    result.utf8_output()
}

/// Resolve `name` the way [`Process::launch`] would, without spawning.
///
/// Goes through [`ExecutableResolver::shared`], so the answer is cached for
/// later launches too.
pub fn find_executable(name: &str, working_directory: Option<&Path>) -> Option<PathBuf> {
    ExecutableResolver::shared().resolve(name, working_directory)
}

fn collecting<S: AsRef<str>>(arguments: &[S], environment: Environment) -> ProcessBuilder {
    Process::builder(arguments.iter().map(|arg| arg.as_ref().to_string()))
        .environment(environment)
        .output_redirection(OutputRedirection::collect())
}
