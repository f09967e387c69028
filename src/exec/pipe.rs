// src/exec/pipe.rs

//! Pipe creation for the POSIX launcher.
//!
//! Both ends are [`OwnedFd`]s, so every descriptor has exactly one owner and
//! is closed once, when that owner is dropped, on success and error paths
//! alike. Ends are created close-on-exec; the launcher's `dup2` file actions
//! are what make them visible to the child as fds 0/1/2.

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Unidirectional OS pipe.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    pub fn new() -> io::Result<Self> {
        let mut fds: [libc::c_int; 2] = [-1, -1];
        create(&mut fds)?;
        // SAFETY: pipe(2) succeeded, so both descriptors are open and owned
        // by nobody else.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        Ok(Self { read, write })
    }

    pub fn read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    pub fn write_fd(&self) -> RawFd {
        self.write.as_raw_fd()
    }

    /// Keep the read end, closing the write end.
    pub fn into_reader(self) -> File {
        File::from(self.read)
    }

    /// Keep the write end, closing the read end.
    pub fn into_writer(self) -> File {
        File::from(self.write)
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn create(fds: &mut [libc::c_int; 2]) -> io::Result<()> {
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
fn create(fds: &mut [libc::c_int; 2]) -> io::Result<()> {
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    for &fd in fds.iter() {
        if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } == -1 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fds[0]);
                libc::close(fds[1]);
            }
            return Err(err);
        }
    }
    Ok(())
}
