// src/env.rs

//! Environment passed to a child process.
//!
//! Keys compare byte-for-byte on POSIX hosts. On Windows, where the OS
//! treats variable names case-insensitively, [`EnvironmentKey`] folds ASCII
//! case for equality, ordering and hashing while keeping the spelling it was
//! created with.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct EnvironmentKey(String);

impl EnvironmentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(windows)]
    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_uppercase())
    }

    #[cfg(not(windows))]
    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes()
    }
}

impl PartialEq for EnvironmentKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded().eq(other.folded())
    }
}

impl Eq for EnvironmentKey {}

impl PartialOrd for EnvironmentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnvironmentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl Hash for EnvironmentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.folded() {
            state.write_u8(byte);
        }
        state.write_u8(0xff);
    }
}

impl fmt::Display for EnvironmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvironmentKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for EnvironmentKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Ordered mapping of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct Environment {
    vars: BTreeMap<EnvironmentKey, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the calling process's environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn current() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Insert or replace a variable, returning the previous value.
    pub fn insert(&mut self, key: impl Into<EnvironmentKey>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        // Replace the key too so the latest spelling wins on case-folding hosts.
        let previous = self.vars.remove(&key);
        self.vars.insert(key, value.into());
        previous
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(&EnvironmentKey::new(key)).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(&EnvironmentKey::new(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(&EnvironmentKey::new(key))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`.
    pub fn extend_from(&mut self, other: &Environment) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<EnvironmentKey>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (key, value) in iter {
            env.insert(key, value);
        }
        env
    }
}

impl From<BTreeMap<String, String>> for Environment {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}
