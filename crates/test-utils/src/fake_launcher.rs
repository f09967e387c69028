use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use procexec::ExecutableResolver;
use procexec::errors::{ProcessError, Result};
use procexec::exec::{ChildHandle, Launcher, SpawnRequest, Spawned};
use procexec::fs::mock::MockFileSystem;
use procexec::types::ExitStatus;

/// What a [`FakeLauncher`] recorded about one launch.
#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub capture_output: bool,
    pub merge_stderr: bool,
    pub start_new_process_group: bool,
}

/// A launcher that never touches the OS:
/// - serves scripted stdout/stderr bytes through in-memory readers
/// - counts launches and reaps
/// - records delivered signals
#[derive(Debug, Clone)]
pub struct FakeLauncher {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_status: ExitStatus,
    reap_delay: Duration,
    launch_delay: Duration,
    launch_error: Option<ProcessError>,
    reap_error: Option<ProcessError>,
    launches: Arc<Mutex<Vec<RecordedLaunch>>>,
    reaps: Arc<AtomicUsize>,
    signals: Arc<Mutex<Vec<i32>>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_status: ExitStatus::Terminated(0),
            reap_delay: Duration::ZERO,
            launch_delay: Duration::ZERO,
            launch_error: None,
            reap_error: None,
            launches: Arc::new(Mutex::new(Vec::new())),
            reaps: Arc::new(AtomicUsize::new(0)),
            signals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn stdout(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdout = bytes.into();
        self
    }

    pub fn stderr(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stderr = bytes.into();
        self
    }

    pub fn exit_status(mut self, status: ExitStatus) -> Self {
        self.exit_status = status;
        self
    }

    /// Make every reap block for `delay` first.
    pub fn reap_delay(mut self, delay: Duration) -> Self {
        self.reap_delay = delay;
        self
    }

    /// Make every launch block for `delay` before spawning (or failing).
    pub fn launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    pub fn fail_launch(mut self, err: ProcessError) -> Self {
        self.launch_error = Some(err);
        self
    }

    pub fn fail_reap(mut self, err: ProcessError) -> Self {
        self.reap_error = Some(err);
        self
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn launches(&self) -> Vec<RecordedLaunch> {
        self.launches.lock().unwrap().clone()
    }

    pub fn reap_count(&self) -> usize {
        self.reaps.load(Ordering::SeqCst)
    }

    pub fn signals(&self) -> Vec<i32> {
        self.signals.lock().unwrap().clone()
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, request: &SpawnRequest<'_>) -> Result<Spawned> {
        std::thread::sleep(self.launch_delay);
        if let Some(err) = &self.launch_error {
            return Err(err.clone());
        }

        let pid = {
            let mut launches = self.launches.lock().unwrap();
            launches.push(RecordedLaunch {
                executable: request.executable.to_path_buf(),
                arguments: request.arguments.to_vec(),
                working_directory: request.working_directory.map(|p| p.to_path_buf()),
                capture_output: request.capture_output,
                merge_stderr: request.merge_stderr,
                start_new_process_group: request.start_new_process_group,
            });
            4000 + launches.len() as u32
        };

        let (stdout, stderr) = match (request.capture_output, request.merge_stderr) {
            (false, _) => (None, None),
            (true, true) => {
                let mut merged = self.stdout.clone();
                merged.extend_from_slice(&self.stderr);
                (Some(merged), None)
            }
            (true, false) => (Some(self.stdout.clone()), Some(self.stderr.clone())),
        };

        Ok(Spawned {
            child: Arc::new(FakeChild {
                pid,
                exit_status: self.exit_status,
                reap_delay: self.reap_delay,
                reap_error: self.reap_error.clone(),
                reaps: Arc::clone(&self.reaps),
                signals: Arc::clone(&self.signals),
            }),
            stdin: Box::new(std::io::sink()),
            stdout: stdout.map(|b| Box::new(Cursor::new(b)) as Box<dyn std::io::Read + Send>),
            stderr: stderr.map(|b| Box::new(Cursor::new(b)) as Box<dyn std::io::Read + Send>),
        })
    }
}

#[derive(Debug)]
struct FakeChild {
    pid: u32,
    exit_status: ExitStatus,
    reap_delay: Duration,
    reap_error: Option<ProcessError>,
    reaps: Arc<AtomicUsize>,
    signals: Arc<Mutex<Vec<i32>>>,
}

impl ChildHandle for FakeChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn wait(&self) -> Result<ExitStatus> {
        std::thread::sleep(self.reap_delay);
        self.reaps.fetch_add(1, Ordering::SeqCst);
        match &self.reap_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.exit_status),
        }
    }

    fn signal(&self, signal: i32) -> Result<()> {
        self.signals.lock().unwrap().push(signal);
        Ok(())
    }
}

/// Resolver that finds exactly `programs`, under `/fake/bin`.
pub fn fake_resolver(programs: &[&str]) -> Arc<ExecutableResolver> {
    let fs = MockFileSystem::new("/fake/cwd");
    for program in programs {
        fs.add_executable(format!("/fake/bin/{program}"));
    }
    Arc::new(ExecutableResolver::with_filesystem(
        Arc::new(fs),
        vec![PathBuf::from("/fake/bin")],
    ))
}
