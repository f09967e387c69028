// src/config/validate.rs

use crate::config::model::{JobConfig, RawJobFile};
use crate::errors::ConfigError;
use crate::types::OutputMode;

type Result<T> = std::result::Result<T, ConfigError>;

impl TryFrom<RawJobFile> for JobConfig {
    type Error = ConfigError;

    fn try_from(raw: RawJobFile) -> std::result::Result<Self, Self::Error> {
        validate_job(&raw)?;
        Ok(JobConfig::new_unchecked(raw))
    }
}

/// Check a raw job without converting it.
pub fn validate_job(job: &RawJobFile) -> Result<()> {
    validate_args(job)?;
    validate_working_directory(job)?;
    validate_environment(job)?;
    validate_output(job)?;
    Ok(())
}

fn validate_args(job: &RawJobFile) -> Result<()> {
    match job.args.first() {
        None => Err(ConfigError::Invalid(
            "`args` must contain at least the program to run".to_string(),
        )),
        Some(program) if program.trim().is_empty() => Err(ConfigError::Invalid(
            "`args[0]` (the program) must not be empty".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

fn validate_working_directory(job: &RawJobFile) -> Result<()> {
    if let Some(dir) = &job.working_directory {
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "`working_directory` must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_environment(job: &RawJobFile) -> Result<()> {
    for key in job.environment.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(ConfigError::Invalid(format!(
                "invalid environment variable name '{key}'"
            )));
        }
    }
    Ok(())
}

fn validate_output(job: &RawJobFile) -> Result<()> {
    if job.output.mode == OutputMode::Inherit && job.output.merge_stderr {
        return Err(ConfigError::Invalid(
            "[output].merge_stderr requires mode \"collect\" or \"stream\"".to_string(),
        ));
    }
    Ok(())
}
