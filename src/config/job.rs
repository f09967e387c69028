// src/config/job.rs

//! Turning a validated [`JobConfig`] into a [`ProcessBuilder`].

use crate::config::model::JobConfig;
use crate::env::Environment;
use crate::process::ProcessBuilder;
use crate::types::{OutputMode, OutputRedirection};

impl JobConfig {
    /// The environment the child will see.
    pub fn environment(&self) -> Environment {
        let mut env = if self.inherit_environment {
            Environment::current()
        } else {
            Environment::new()
        };
        for (key, value) in &self.environment {
            env.insert(key.as_str(), value.as_str());
        }
        env
    }

    /// Redirection for this job. `stream` forwards chunks to this process's
    /// own stdout and stderr.
    pub fn output_redirection(&self) -> OutputRedirection {
        let merge_stderr = self.output.merge_stderr;
        match self.output.mode {
            OutputMode::Inherit => OutputRedirection::None,
            OutputMode::Collect => OutputRedirection::Collect { merge_stderr },
            OutputMode::Stream => OutputRedirection::forward_to_parent(merge_stderr),
        }
    }

    pub fn to_builder(&self) -> ProcessBuilder {
        let mut builder = ProcessBuilder::new(self.args.iter().cloned())
            .environment(self.environment())
            .output_redirection(self.output_redirection())
            .start_new_process_group(self.start_new_process_group);
        if let Some(dir) = &self.working_directory {
            builder = builder.working_directory(dir.clone());
        }
        builder
    }
}
