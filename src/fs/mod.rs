// src/fs/mod.rs

//! Filesystem queries needed to resolve executables.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// `true` if `path` names a regular file the current user may execute.
    fn is_executable_file(&self, path: &Path) -> bool;

    /// Working directory of the calling process, if it can be determined.
    fn current_dir(&self) -> Option<PathBuf>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    #[cfg(unix)]
    fn is_executable_file(&self, path: &Path) -> bool {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let is_file = std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return false;
        }
        // access(2) honours the effective uid/gid, unlike raw mode bits.
        match CString::new(path.as_os_str().as_bytes()) {
            Ok(c_path) => unsafe { libc::access(c_path.as_ptr(), libc::X_OK) == 0 },
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    fn is_executable_file(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }
}
