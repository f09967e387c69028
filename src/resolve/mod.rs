// src/resolve/mod.rs

//! Executable lookup.
//!
//! - [`resolver`] owns [`ExecutableResolver`], which turns a program token
//!   into an absolute path and caches lookups made from the current working
//!   directory.
//! - [`search_path`] parses `PATH`-style variables.

pub mod resolver;
pub mod search_path;

pub use resolver::ExecutableResolver;
pub use search_path::parse_search_path;
