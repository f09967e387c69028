// tests/cli_run.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;

use procexec::cli::CliArgs;

type TestResult = Result<(), Box<dyn Error>>;

fn cli(args: &[&str]) -> CliArgs {
    CliArgs::parse_from(std::iter::once("procexec").chain(args.iter().copied()))
}

#[tokio::test]
async fn exit_code_mirrors_the_child() -> TestResult {
    init_tracing();

    let code = with_timeout(procexec::run(cli(&["--", "sh", "-c", "exit 3"]))).await?;
    assert_eq!(code, 3);

    let code = with_timeout(procexec::run(cli(&["--", "true"]))).await?;
    assert_eq!(code, 0);
    Ok(())
}

#[tokio::test]
async fn check_turns_nonzero_exit_into_an_error() {
    let outcome = with_timeout(procexec::run(cli(&["--check", "--", "sh", "-c", "exit 2"]))).await;
    let err = outcome.expect_err("checked run should fail");
    assert!(err.downcast_ref::<procexec::ProcessError>().is_some());
}

#[tokio::test]
async fn signalled_child_maps_to_128_plus_signal() -> TestResult {
    let code = with_timeout(procexec::run(cli(&["--", "sh", "-c", "kill -TERM $$"]))).await?;
    assert_eq!(code, 128 + procexec::process::signals::SIGTERM);
    Ok(())
}

#[tokio::test]
async fn which_reports_lookup_result() -> TestResult {
    assert_eq!(procexec::run(cli(&["--which", "sh"])).await?, 0);
    assert_eq!(procexec::run(cli(&["--which", "definitely-not-a-real-program"])).await?, 1);
    Ok(())
}

#[tokio::test]
async fn job_file_drives_the_launch() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
args = ["sh", "-c", "test \"$JOB_VAR\" = set && exit 7"]

[environment]
JOB_VAR = "set"
"#
    )?;
    let path = file.path().to_string_lossy().into_owned();

    let code = with_timeout(procexec::run(cli(&["--config", &path]))).await?;
    assert_eq!(code, 7);
    Ok(())
}

#[tokio::test]
async fn missing_command_is_rejected() {
    let outcome = procexec::run(cli(&[])).await;
    assert!(outcome.is_err());
}
