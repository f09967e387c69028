// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::OutputMode;

/// One launch as read from a TOML job file.
///
/// ```toml
/// args = ["sh", "-c", "echo hi"]
/// working_directory = "/tmp"
/// inherit_environment = true
/// start_new_process_group = true
///
/// [environment]
/// FOO = "bar"
///
/// [output]
/// mode = "collect"
/// merge_stderr = false
/// ```
///
/// Everything except `args` is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobFile {
    /// Argument vector; the first element names the program.
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    /// Start from the caller's environment (default) or from an empty one.
    #[serde(default = "default_true")]
    pub inherit_environment: bool,

    #[serde(default = "default_true")]
    pub start_new_process_group: bool,

    /// Variables set on top of the (possibly inherited) environment.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub output: OutputSection,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSection {
    /// `"inherit"`, `"collect"` (default) or `"stream"`.
    #[serde(default)]
    pub mode: OutputMode,

    #[serde(default)]
    pub merge_stderr: bool,
}

fn default_true() -> bool {
    true
}

/// A validated job. Construct through `JobConfig::try_from(RawJobFile)`.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub inherit_environment: bool,
    pub start_new_process_group: bool,
    pub environment: BTreeMap<String, String>,
    pub output: OutputSection,
}

impl JobConfig {
    pub(crate) fn new_unchecked(raw: RawJobFile) -> Self {
        Self {
            args: raw.args,
            working_directory: raw.working_directory,
            inherit_environment: raw.inherit_environment,
            start_new_process_group: raw.start_new_process_group,
            environment: raw.environment,
            output: raw.output,
        }
    }

    /// Back to the raw form, e.g. to apply overrides and re-validate.
    pub fn into_raw(self) -> RawJobFile {
        RawJobFile {
            args: self.args,
            working_directory: self.working_directory,
            inherit_environment: self.inherit_environment,
            start_new_process_group: self.start_new_process_group,
            environment: self.environment,
            output: self.output,
        }
    }
}
