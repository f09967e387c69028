// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`launcher`] defines the [`Launcher`] / [`ChildHandle`] seam and picks
//!   the platform implementation.
//! - [`posix`] spawns with `posix_spawn` on unix; [`pipe`] creates the pipes
//!   it wires up.
//! - [`host`] spawns through the standard library on Windows.
//! - [`pump`] drains captured pipes on background threads.

pub mod launcher;
pub mod pump;

#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod posix;

#[cfg(windows)]
pub mod host;

pub use launcher::{ChildHandle, Launcher, PlatformLauncher, SpawnRequest, Spawned};
