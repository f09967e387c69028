// tests/process_unix.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, recording_sink, with_timeout};

use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use procexec::process::signals::SIGKILL;
use procexec::{
    Environment, ExecutableResolver, ExitStatus, OutputRedirection, Process, ProcessError,
    checked_output, checked_output_async, find_executable, run_and_collect, run_process,
};

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

#[test]
fn echo_collects_stdout() -> TestResult {
    init_tracing();

    let result = run_and_collect(&["echo", "hello"], Environment::current())?;
    assert_eq!(result.exit_status(), ExitStatus::Terminated(0));
    assert_eq!(result.utf8_output()?, "hello\n");
    assert_eq!(result.utf8_stderr_output()?, "");
    Ok(())
}

#[test]
fn missing_executable_is_reported_by_name() {
    let err = run_and_collect(&["definitely-not-a-real-program"], Environment::current())
        .expect_err("launch should fail");
    assert_eq!(
        err,
        ProcessError::MissingExecutableProgram("definitely-not-a-real-program".to_string())
    );
}

#[test]
fn nonzero_exit_only_fails_the_checked_helpers() -> TestResult {
    let raw = run_and_collect(&sh("echo partial; exit 4"), Environment::current())?;
    assert_eq!(raw.exit_status(), ExitStatus::Terminated(4));

    match checked_output(&sh("echo partial; exit 4"), Environment::current()) {
        Err(ProcessError::NonZeroExit(result)) => {
            assert_eq!(result.exit_status(), ExitStatus::Terminated(4));
            let message = ProcessError::NonZeroExit(result).to_string();
            assert!(message.contains("exit 4"), "{message}");
            assert!(message.contains("\n    partial"), "{message}");
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn checked_output_async_returns_stdout() -> TestResult {
    let out = with_timeout(checked_output_async(&["printf", "abc"], Environment::current())).await?;
    assert_eq!(out, "abc");
    Ok(())
}

#[test]
fn large_output_on_both_streams_does_not_deadlock() -> TestResult {
    init_tracing();

    // Well past a typical 64 KiB pipe buffer on each stream.
    let script = "i=0; while [ $i -lt 3000 ]; do \
                  echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx'; \
                  echo 'yyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyy' >&2; \
                  i=$((i+1)); done";

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(run_and_collect(&sh(script), Environment::current()));
    });
    let result = rx.recv_timeout(Duration::from_secs(30))??;

    assert!(result.exit_status().success());
    assert_eq!(result.output().map(<[u8]>::len), Ok(3000 * 51));
    assert_eq!(result.stderr_output().map(<[u8]>::len), Ok(3000 * 51));
    Ok(())
}

#[test]
fn merged_stderr_keeps_write_order() -> TestResult {
    let process = Process::builder(sh("echo one; echo two >&2; echo three"))
        .output_redirection(OutputRedirection::collect_merged())
        .build();
    drop(process.launch()?);
    let result = process.wait()?;

    assert_eq!(result.utf8_output()?, "one\ntwo\nthree\n");
    assert_eq!(result.utf8_stderr_output()?, "");
    Ok(())
}

#[test]
fn streaming_sees_the_same_bytes_as_collecting() -> TestResult {
    let script = "echo first; echo second >&2; echo third";

    let collected = run_and_collect(&sh(script), Environment::current())?;

    let (stdout_sink, stdout_seen) = recording_sink();
    let (stderr_sink, stderr_seen) = recording_sink();
    let streamed = run_process(
        Process::builder(sh(script)).output_redirection(OutputRedirection::stream(
            move |chunk| stdout_sink(chunk),
            move |chunk| stderr_sink(chunk),
        )),
    )?;

    assert_eq!(collected.output(), Ok(stdout_seen.lock().unwrap().as_slice()));
    assert_eq!(collected.stderr_output(), Ok(stderr_seen.lock().unwrap().as_slice()));
    assert_eq!(streamed.output(), Ok(&b""[..]));
    Ok(())
}

#[test]
fn stdin_reaches_the_child() -> TestResult {
    let process = Process::new(["cat"]);
    let mut stdin = process.launch()?;
    stdin.write_all(b"piped through\n")?;
    stdin.close()?;
    assert!(stdin.is_closed());

    let result = process.wait()?;
    assert_eq!(result.utf8_output()?, "piped through\n");
    Ok(())
}

#[test]
fn kill_is_reported_as_signalled() -> TestResult {
    let process = Process::new(["sleep", "30"]);
    let _stdin = process.launch()?;
    assert!(process.pid().is_some());

    process.signal(SIGKILL)?;
    let result = process.wait()?;
    assert_eq!(result.exit_status(), ExitStatus::Signalled(SIGKILL));
    assert_eq!(result.exit_status().as_exit_code(), 128 + SIGKILL);
    Ok(())
}

#[test]
fn runs_in_the_requested_working_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let expected = dir.path().canonicalize()?;

    let process = Process::builder(["pwd", "-P"])
        .working_directory(dir.path())
        .build();
    match process.launch() {
        Ok(stdin) => drop(stdin),
        // Hosts without posix_spawn_file_actions_addchdir_np.
        Err(ProcessError::WorkingDirectoryNotSupported) => return Ok(()),
        Err(err) => return Err(err.into()),
    }

    let result = process.wait()?;
    assert_eq!(result.utf8_output()?.trim_end(), expected.to_string_lossy());
    Ok(())
}

#[test]
fn environment_is_replaced_not_merged() -> TestResult {
    let env: Environment = [("PATH", "/usr/bin:/bin"), ("ONLY_THIS", "yes")]
        .into_iter()
        .collect();
    let out = checked_output(&["env"], env)?;

    let mut lines: Vec<_> = out.lines().filter(|l| !l.starts_with("PWD=")).collect();
    lines.sort();
    assert_eq!(lines, ["ONLY_THIS=yes", "PATH=/usr/bin:/bin"]);
    Ok(())
}

#[test]
fn logging_handler_runs_before_spawn() -> TestResult {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    run_process(
        Process::builder(["echo", "it's"])
            .logging_handler(move |line| recorder.lock().unwrap().push(line.to_string())),
    )?;

    assert_eq!(seen.lock().unwrap().as_slice(), [r"echo 'it'\''s'"]);
    Ok(())
}

#[tokio::test]
async fn wait_async_matches_blocking_wait() -> TestResult {
    let process = Process::new(["echo", "async"]);
    drop(process.launch()?);

    let awaited = with_timeout(process.wait_async()).await?;
    assert_eq!(awaited.utf8_output()?, "async\n");
    assert_eq!(process.wait()?, awaited);
    Ok(())
}

#[test]
fn wait_async_stays_responsive_while_another_thread_reaps() -> TestResult {
    init_tracing();

    // Output closes at once, so the pumps drain and the reap starts early.
    let process = Process::new(sh("exec >&- 2>&-; sleep 3"));
    drop(process.launch()?);

    let blocking = {
        let process = process.clone();
        std::thread::spawn(move || process.wait())
    };
    std::thread::sleep(Duration::from_millis(300));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let _guard = runtime.enter();
    let started = std::time::Instant::now();
    let outcome = runtime.block_on(tokio::time::timeout(
        Duration::from_millis(100),
        process.wait_async(),
    ));
    assert!(outcome.is_err(), "wait_async finished before the child exited");
    assert!(started.elapsed() < Duration::from_secs(1), "executor was blocked");

    process.signal(SIGKILL)?;
    let result = blocking.join().expect("blocking waiter panicked")?;
    assert_eq!(result.exit_status(), ExitStatus::Signalled(SIGKILL));
    Ok(())
}

#[test]
fn convenience_helpers_share_one_resolver_cache() -> TestResult {
    run_and_collect(&["true"], Environment::current())?;
    let first = ExecutableResolver::shared().cached("true");
    assert!(matches!(first, Some(Some(_))), "first run did not cache: {first:?}");

    run_and_collect(&["true"], Environment::current())?;
    assert_eq!(ExecutableResolver::shared().cached("true"), first);
    assert_eq!(find_executable("true", None), first.flatten());
    Ok(())
}
