// src/lib.rs

//! Cross-platform subprocess execution.
//!
//! Spawn a child, drain its stdout and stderr on concurrent background
//! threads, and hand one race-free [`ProcessResult`] to any number of
//! blocking or async waiters.
//!
//! ```no_run
//! use procexec::{Environment, OutputRedirection, Process};
//!
//! # fn main() -> procexec::errors::Result<()> {
//! let process = Process::builder(["echo", "hello"])
//!     .environment(Environment::current())
//!     .output_redirection(OutputRedirection::collect())
//!     .build();
//! drop(process.launch()?);
//! let result = process.wait()?;
//! assert_eq!(result.utf8_output()?, "hello\n");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod process;
pub mod resolve;
pub mod run;
pub mod types;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

pub use crate::env::{Environment, EnvironmentKey};
pub use crate::errors::{ProcessError, SystemError};
pub use crate::process::{Process, ProcessBuilder, ProcessStdin};
pub use crate::resolve::ExecutableResolver;
pub use crate::run::{
    check_result, checked_output, checked_output_async, find_executable, run_and_collect,
    run_and_collect_async, run_process, run_process_async,
};
pub use crate::types::{ExitStatus, OutputMode, OutputRedirection, ProcessResult, StreamKind};

use crate::cli::CliArgs;
use crate::config::{JobConfig, RawJobFile, load_and_validate};

/// High-level entry point used by `main.rs`.
///
/// Returns the exit code the binary should terminate with.
pub async fn run(args: CliArgs) -> Result<i32> {
    if let Some(name) = &args.which {
        return Ok(print_which(name, args.cwd.as_deref()));
    }

    let job = job_from_args(&args)?;
    debug!(?job, "running job");

    let collect = matches!(job.output_redirection(), OutputRedirection::Collect { .. });
    let result = run_process_async(job.to_builder()).await?;

    if collect {
        write_collected(&result)?;
    }

    if args.check {
        check_result(result.clone())?;
    }
    Ok(result.exit_status().as_exit_code())
}

/// Build the job from `--config` or from the trailing command, then apply
/// command-line overrides.
fn job_from_args(args: &CliArgs) -> Result<JobConfig> {
    let mut raw = match &args.config {
        Some(path) => {
            load_and_validate(path)
                .with_context(|| format!("loading job file '{path}'"))?
                .into_raw()
        }
        None => RawJobFile {
            args: args.command.clone(),
            working_directory: None,
            inherit_environment: true,
            start_new_process_group: true,
            environment: Default::default(),
            output: Default::default(),
        },
    };

    if let Some(dir) = &args.cwd {
        raw.working_directory = Some(PathBuf::from(dir));
    }
    if let Some(mode) = args.mode {
        raw.output.mode = mode;
    }
    if args.merge_stderr {
        raw.output.merge_stderr = true;
    }
    if args.no_new_process_group {
        raw.start_new_process_group = false;
    }

    JobConfig::try_from(raw).context("invalid job")
}

fn print_which(name: &str, cwd: Option<&str>) -> i32 {
    match find_executable(name, cwd.map(std::path::Path::new)) {
        Some(path) => {
            println!("{}", path.display());
            0
        }
        None => {
            eprintln!("procexec: no executable found for '{name}'");
            1
        }
    }
}

fn write_collected(result: &ProcessResult) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    match result.output() {
        Ok(bytes) => stdout.write_all(bytes).context("writing child stdout")?,
        Err(err) => eprintln!("procexec: {err}"),
    }
    stdout.flush()?;

    let mut stderr = std::io::stderr().lock();
    match result.stderr_output() {
        Ok(bytes) => stderr.write_all(bytes).context("writing child stderr")?,
        Err(err) => eprintln!("procexec: {err}"),
    }
    Ok(())
}
