// src/resolve/search_path.rs

use std::path::PathBuf;

/// Split a `PATH`-style value into directories. Empty entries are dropped.
pub fn parse_search_path(value: &str) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// Search path of the calling process.
pub fn current_search_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|value| {
            std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// File-name suffixes tried for bare program names.
#[cfg(windows)]
pub fn executable_extensions() -> Vec<String> {
    let pathext = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    let mut exts: Vec<String> = vec![String::new()];
    exts.extend(
        pathext
            .split(';')
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase()),
    );
    exts
}

#[cfg(not(windows))]
pub fn executable_extensions() -> Vec<String> {
    vec![String::new()]
}
