// src/fs/mock.rs

use super::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEntry {
    Executable,
    File,
    Dir,
}

/// In-memory filesystem for resolver tests.
///
/// Also counts executable probes so tests can tell a cache hit from a fresh
/// search.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    current_dir: PathBuf,
    probes: Arc<Mutex<usize>>,
}

impl MockFileSystem {
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        let current_dir = current_dir.into();
        let mut entries = HashMap::new();
        entries.insert(current_dir.clone(), MockEntry::Dir);

        Self {
            entries: Arc::new(Mutex::new(entries)),
            current_dir,
            probes: Arc::new(Mutex::new(0)),
        }
    }

    pub fn add_executable(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Executable);
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Dir);
    }

    /// Number of `is_executable_file` calls made so far.
    pub fn probe_count(&self) -> usize {
        *self.probes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            parent = dir.parent();
        }
        entries.insert(path.to_path_buf(), entry);
    }
}

impl FileSystem for MockFileSystem {
    fn is_executable_file(&self, path: &Path) -> bool {
        *self.probes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(entries.get(path), Some(MockEntry::Executable))
    }

    fn current_dir(&self) -> Option<PathBuf> {
        Some(self.current_dir.clone())
    }
}
