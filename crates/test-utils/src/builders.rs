#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use procexec::config::{JobConfig, OutputSection, RawJobFile};
use procexec::types::OutputMode;

/// Builder for `RawJobFile` / `JobConfig` to simplify test setup.
pub struct JobFileBuilder {
    job: RawJobFile,
}

impl JobFileBuilder {
    pub fn new<S: AsRef<str>>(args: &[S]) -> Self {
        Self {
            job: RawJobFile {
                args: args.iter().map(|a| a.as_ref().to_string()).collect(),
                working_directory: None,
                inherit_environment: true,
                start_new_process_group: true,
                environment: BTreeMap::new(),
                output: OutputSection::default(),
            },
        }
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.job.working_directory = Some(dir.into());
        self
    }

    pub fn inherit_environment(mut self, val: bool) -> Self {
        self.job.inherit_environment = val;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.job.environment.insert(key.to_string(), value.to_string());
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.job.output.mode = mode;
        self
    }

    pub fn merge_stderr(mut self, val: bool) -> Self {
        self.job.output.merge_stderr = val;
        self
    }

    pub fn start_new_process_group(mut self, val: bool) -> Self {
        self.job.start_new_process_group = val;
        self
    }

    pub fn build_raw(self) -> RawJobFile {
        self.job
    }

    pub fn build(self) -> JobConfig {
        JobConfig::try_from(self.job).expect("Failed to build valid job from builder")
    }
}
