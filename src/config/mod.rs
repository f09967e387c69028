// src/config/mod.rs

//! Job files for the `procexec` binary.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a job file from disk (`loader.rs`).
//! - Validate it (`validate.rs`).
//! - Turn a validated job into a `ProcessBuilder` (`job.rs`).

pub mod job;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_job};
pub use model::{JobConfig, OutputSection, RawJobFile};
pub use validate::validate_job;
