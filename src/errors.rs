// src/errors.rs

//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reasons a workload cannot be launched.
///
/// Detected before any process is spawned, so a `LaunchError` never leaves
/// anything behind.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("workload directory not found: {0:?}")]
    WorkloadDirMissing(PathBuf),

    #[error("miner executable not found: {0:?}")]
    ExecutableMissing(PathBuf),

    #[error("miner executable not readable: {path:?}: {reason}")]
    ExecutableUnreadable { path: PathBuf, reason: String },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RigwatchError>;
