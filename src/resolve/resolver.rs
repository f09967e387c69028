// src/resolve/resolver.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, trace};

use crate::fs::{FileSystem, RealFileSystem};
use crate::resolve::search_path::{current_search_path, executable_extensions};

/// Turns program tokens into absolute executable paths.
///
/// Lookups made relative to the resolver's current directory are cached by
/// program token, negative results included. A lookup from any other
/// working directory always searches afresh and never touches the cache,
/// since relative `PATH` entries can resolve differently per directory.
///
/// Share one resolver between processes through an `Arc`.
#[derive(Debug)]
pub struct ExecutableResolver {
    fs: Arc<dyn FileSystem>,
    search_path: Vec<PathBuf>,
    current_dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl ExecutableResolver {
    /// Resolver over the real filesystem, the process `PATH` and the process
    /// working directory at construction time.
    pub fn new() -> Self {
        Self::with_filesystem(Arc::new(RealFileSystem), current_search_path())
    }

    /// Process-wide resolver, created on first use.
    ///
    /// Every builder without an explicit resolver and [`find_executable`]
    /// share it, so repeated launches of the same program search `PATH` once.
    /// Its notion of the current directory and `PATH` is fixed when it is
    /// first created.
    ///
    /// [`find_executable`]: crate::run::find_executable
    pub fn shared() -> Arc<ExecutableResolver> {
        static SHARED: OnceLock<Arc<ExecutableResolver>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ExecutableResolver::new())))
    }

    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self::with_filesystem(Arc::new(RealFileSystem), search_path)
    }

    pub fn with_filesystem(fs: Arc<dyn FileSystem>, search_path: Vec<PathBuf>) -> Self {
        let current_dir = fs.current_dir();
        Self {
            fs,
            search_path,
            current_dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Resolve `program`, returning `None` when nothing executable matches.
    ///
    /// Absolute and multi-segment relative paths are only validated, never
    /// searched for.
    pub fn resolve(&self, program: &str, working_directory: Option<&Path>) -> Option<PathBuf> {
        if program.is_empty() {
            return None;
        }

        let base_dir = working_directory.or(self.current_dir.as_deref());
        let program_path = Path::new(program);

        if program_path.is_absolute() {
            return self.check(program_path.to_path_buf());
        }
        if program_path.components().count() > 1 {
            let candidate = match base_dir {
                Some(dir) => dir.join(program_path),
                None => program_path.to_path_buf(),
            };
            return self.check(candidate);
        }

        let cacheable = match (working_directory, self.current_dir.as_deref()) {
            (None, _) => true,
            (Some(requested), Some(current)) => requested == current,
            (Some(_), None) => false,
        };

        if cacheable {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(program) {
                trace!(program, resolved = ?hit, "executable cache hit");
                return hit.clone();
            }
        }

        let found = self.search(program, base_dir);
        debug!(program, resolved = ?found, cached = cacheable, "searched for executable");

        if cacheable {
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(program.to_string(), found.clone());
        }
        found
    }

    /// Drop every cached lookup.
    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// The cached lookup for `program`, if any. `Some(None)` is a cached miss.
    pub fn cached(&self, program: &str) -> Option<Option<PathBuf>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(program)
            .cloned()
    }

    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn search(&self, program: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
        let extensions = executable_extensions();
        for entry in &self.search_path {
            let dir = match base_dir {
                Some(base) if entry.is_relative() => base.join(entry),
                _ => entry.clone(),
            };
            for ext in &extensions {
                let candidate = dir.join(format!("{program}{ext}"));
                if self.fs.is_executable_file(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn check(&self, candidate: PathBuf) -> Option<PathBuf> {
        if self.fs.is_executable_file(&candidate) {
            Some(candidate)
        } else {
            None
        }
    }
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self::new()
    }
}
