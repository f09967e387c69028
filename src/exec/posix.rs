// src/exec/posix.rs

//! `posix_spawn`-based launcher.
//!
//! The child gets:
//! - an empty signal mask and default dispositions for every catchable
//!   signal,
//! - optionally its own process group,
//! - stdin from a pipe; stdout/stderr either from pipes or inherited,
//! - optionally a new working directory via the `addchdir` file action.
//!
//! There is no `fork`/`exec` fallback. If the host C library lacks the
//! `addchdir` file action, asking for a working directory fails with
//! [`ProcessError::WorkingDirectoryNotSupported`].

use std::ffi::{CString, OsStr};
use std::io::Read;
use std::mem::MaybeUninit;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::ptr;
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::errors::{ProcessError, Result, SystemError};
use crate::exec::launcher::{ChildHandle, Launcher, SpawnRequest, Spawned};
use crate::exec::pipe::Pipe;
use crate::types::ExitStatus;

#[derive(Debug, Default, Clone, Copy)]
pub struct PosixLauncher;

impl PosixLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Whether this host can change the child's working directory at spawn.
    pub fn supports_working_directory() -> bool {
        addchdir_fn().is_some()
    }
}

impl Launcher for PosixLauncher {
    fn launch(&self, request: &SpawnRequest<'_>) -> Result<Spawned> {
        let args = request.arguments;

        let chdir = match request.working_directory {
            Some(dir) => {
                let addchdir = addchdir_fn().ok_or(ProcessError::WorkingDirectoryNotSupported)?;
                Some((addchdir, to_cstring(dir.as_os_str())?))
            }
            None => None,
        };

        let program = to_cstring(request.executable.as_os_str())?;
        let argv = args
            .iter()
            .map(|arg| to_cstring(OsStr::new(arg)))
            .collect::<Result<Vec<_>>>()?;
        let envp = request
            .environment
            .iter()
            .map(|(key, value)| to_cstring(OsStr::new(&format!("{key}={value}"))))
            .collect::<Result<Vec<_>>>()?;
        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = null_terminated(&envp);

        let stdin = open_pipe(args)?;
        let stdout = if request.capture_output {
            Some(open_pipe(args)?)
        } else {
            None
        };
        let stderr = if request.capture_output && !request.merge_stderr {
            Some(open_pipe(args)?)
        } else {
            None
        };

        let mut attrs = SpawnAttributes::new(args)?;
        attrs.reset_signals(args)?;
        attrs.set_flags(request.start_new_process_group, args)?;

        let mut actions = FileActions::new(args)?;
        actions.dup2(stdin.read_fd(), libc::STDIN_FILENO, args)?;
        actions.close_original(stdin.read_fd(), args)?;
        actions.close_original(stdin.write_fd(), args)?;

        match &stdout {
            Some(pipe) => {
                actions.dup2(pipe.write_fd(), libc::STDOUT_FILENO, args)?;
                actions.close_original(pipe.write_fd(), args)?;
                actions.close_original(pipe.read_fd(), args)?;
            }
            None => actions.dup2(libc::STDOUT_FILENO, libc::STDOUT_FILENO, args)?,
        }

        match (&stderr, request.capture_output && request.merge_stderr) {
            (_, true) => actions.dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO, args)?,
            (Some(pipe), false) => {
                actions.dup2(pipe.write_fd(), libc::STDERR_FILENO, args)?;
                actions.close_original(pipe.write_fd(), args)?;
                actions.close_original(pipe.read_fd(), args)?;
            }
            (None, false) => actions.dup2(libc::STDERR_FILENO, libc::STDERR_FILENO, args)?,
        }

        if let Some((addchdir, dir)) = &chdir {
            let rc = unsafe { addchdir(actions.as_mut_ptr(), dir.as_ptr()) };
            check("posix_spawn_file_actions_addchdir_np", rc, args)?;
        }

        let mut pid: libc::pid_t = 0;
        let rc = unsafe {
            libc::posix_spawn(
                &mut pid,
                program.as_ptr(),
                actions.as_ptr(),
                attrs.as_ptr(),
                argv_ptrs.as_ptr(),
                envp_ptrs.as_ptr(),
            )
        };
        check("posix_spawn", rc, args)?;
        debug!(pid, executable = %request.executable.display(), "posix_spawn succeeded");

        // Dropping the child-side ends here leaves each pipe with exactly one
        // open end in the parent.
        Ok(Spawned {
            child: Arc::new(PosixChild {
                pid,
                process_group: request.start_new_process_group,
                arguments: args.to_vec(),
            }),
            stdin: Box::new(stdin.into_writer()),
            stdout: stdout.map(|p| Box::new(p.into_reader()) as Box<dyn Read + Send>),
            stderr: stderr.map(|p| Box::new(p.into_reader()) as Box<dyn Read + Send>),
        })
    }
}

/// A child started by [`PosixLauncher`].
#[derive(Debug)]
pub struct PosixChild {
    pid: libc::pid_t,
    process_group: bool,
    arguments: Vec<String>,
}

impl ChildHandle for PosixChild {
    fn id(&self) -> u32 {
        self.pid as u32
    }

    fn wait(&self) -> Result<ExitStatus> {
        let mut status: libc::c_int = 0;
        loop {
            if unsafe { libc::waitpid(self.pid, &mut status, 0) } != -1 {
                return Ok(ExitStatus::from_wait_status(status));
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                return Err(SystemError::from_io("waitpid", &err, &self.arguments).into());
            }
            trace!(pid = self.pid, "waitpid interrupted; retrying");
        }
    }

    fn signal(&self, signal: i32) -> Result<()> {
        let target = if self.process_group { -self.pid } else { self.pid };
        if unsafe { libc::kill(target, signal) } == -1 {
            return Err(SystemError::last_os_error("kill", &self.arguments).into());
        }
        Ok(())
    }
}

type AddChdirFn = unsafe extern "C" fn(
    *mut libc::posix_spawn_file_actions_t,
    *const libc::c_char,
) -> libc::c_int;

/// Look up the `addchdir` file action once; older C libraries lack it.
fn addchdir_fn() -> Option<AddChdirFn> {
    static ADDCHDIR: OnceLock<Option<AddChdirFn>> = OnceLock::new();

    *ADDCHDIR.get_or_init(|| {
        for name in [
            c"posix_spawn_file_actions_addchdir_np",
            c"posix_spawn_file_actions_addchdir",
        ] {
            let symbol = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
            if !symbol.is_null() {
                // SAFETY: both symbols share this exact C signature.
                return Some(unsafe { std::mem::transmute::<*mut libc::c_void, AddChdirFn>(symbol) });
            }
        }
        debug!("posix_spawn has no addchdir file action on this host");
        None
    })
}

struct SpawnAttributes(Box<MaybeUninit<libc::posix_spawnattr_t>>);

impl SpawnAttributes {
    fn new(args: &[String]) -> Result<Self> {
        let mut inner: Box<MaybeUninit<libc::posix_spawnattr_t>> = Box::new(MaybeUninit::uninit());
        check(
            "posix_spawnattr_init",
            unsafe { libc::posix_spawnattr_init(inner.as_mut_ptr()) },
            args,
        )?;
        Ok(Self(inner))
    }

    fn as_ptr(&self) -> *const libc::posix_spawnattr_t {
        self.0.as_ptr()
    }

    fn as_mut_ptr(&mut self) -> *mut libc::posix_spawnattr_t {
        self.0.as_mut_ptr()
    }

    /// Unmask everything and restore default dispositions for every signal
    /// that can be caught.
    fn reset_signals(&mut self, args: &[String]) -> Result<()> {
        unsafe {
            let mut none = MaybeUninit::<libc::sigset_t>::uninit();
            libc::sigemptyset(none.as_mut_ptr());
            check(
                "posix_spawnattr_setsigmask",
                libc::posix_spawnattr_setsigmask(self.as_mut_ptr(), none.as_ptr()),
                args,
            )?;

            let mut all = MaybeUninit::<libc::sigset_t>::uninit();
            libc::sigfillset(all.as_mut_ptr());
            libc::sigdelset(all.as_mut_ptr(), libc::SIGKILL);
            libc::sigdelset(all.as_mut_ptr(), libc::SIGSTOP);
            check(
                "posix_spawnattr_setsigdefault",
                libc::posix_spawnattr_setsigdefault(self.as_mut_ptr(), all.as_ptr()),
                args,
            )?;
        }
        Ok(())
    }

    fn set_flags(&mut self, new_process_group: bool, args: &[String]) -> Result<()> {
        let mut flags = libc::POSIX_SPAWN_SETSIGMASK | libc::POSIX_SPAWN_SETSIGDEF;
        if new_process_group {
            check(
                "posix_spawnattr_setpgroup",
                unsafe { libc::posix_spawnattr_setpgroup(self.as_mut_ptr(), 0) },
                args,
            )?;
            flags |= libc::POSIX_SPAWN_SETPGROUP;
        }
        check(
            "posix_spawnattr_setflags",
            unsafe { libc::posix_spawnattr_setflags(self.as_mut_ptr(), flags as libc::c_short) },
            args,
        )
    }
}

impl Drop for SpawnAttributes {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawnattr_destroy(self.0.as_mut_ptr());
        }
    }
}

struct FileActions(Box<MaybeUninit<libc::posix_spawn_file_actions_t>>);

impl FileActions {
    fn new(args: &[String]) -> Result<Self> {
        let mut inner: Box<MaybeUninit<libc::posix_spawn_file_actions_t>> =
            Box::new(MaybeUninit::uninit());
        check(
            "posix_spawn_file_actions_init",
            unsafe { libc::posix_spawn_file_actions_init(inner.as_mut_ptr()) },
            args,
        )?;
        Ok(Self(inner))
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        self.0.as_ptr()
    }

    fn as_mut_ptr(&mut self) -> *mut libc::posix_spawn_file_actions_t {
        self.0.as_mut_ptr()
    }

    fn dup2(&mut self, fd: RawFd, target: RawFd, args: &[String]) -> Result<()> {
        check(
            "posix_spawn_file_actions_adddup2",
            unsafe { libc::posix_spawn_file_actions_adddup2(self.as_mut_ptr(), fd, target) },
            args,
        )
    }

    /// Close a pipe end in the child after it has been duplicated. Standard
    /// descriptors are never closed here since they are dup2 targets.
    fn close_original(&mut self, fd: RawFd, args: &[String]) -> Result<()> {
        if fd <= libc::STDERR_FILENO {
            return Ok(());
        }
        check(
            "posix_spawn_file_actions_addclose",
            unsafe { libc::posix_spawn_file_actions_addclose(self.as_mut_ptr(), fd) },
            args,
        )
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(self.0.as_mut_ptr());
        }
    }
}

fn check(call: &'static str, rc: libc::c_int, args: &[String]) -> Result<()> {
    if rc != 0 {
        return Err(SystemError::new(call, rc, args).into());
    }
    Ok(())
}

fn open_pipe(args: &[String]) -> Result<Pipe> {
    Pipe::new().map_err(|err| SystemError::from_io("pipe", &err, args).into())
}

fn to_cstring(value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes())
        .map_err(|_| ProcessError::InteriorNul(value.to_string_lossy().into_owned()))
}

fn null_terminated(values: &[CString]) -> Vec<*mut libc::c_char> {
    values
        .iter()
        .map(|v| v.as_ptr() as *mut libc::c_char)
        .chain(std::iter::once(ptr::null_mut()))
        .collect()
}
