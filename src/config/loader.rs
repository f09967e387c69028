// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{JobConfig, RawJobFile};
use crate::errors::ConfigError;

/// Load a job file from a given path and return the raw `RawJobFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for a
/// checked [`JobConfig`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawJobFile, ConfigError> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_job(&contents)
}

/// Parse job-file text.
pub fn parse_job(contents: &str) -> Result<RawJobFile, ConfigError> {
    Ok(toml::from_str(contents)?)
}

/// Load a job file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<JobConfig, ConfigError> {
    let raw = load_from_path(path)?;
    JobConfig::try_from(raw)
}
