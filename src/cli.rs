// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::backend::BackendKind;
use crate::config::default_config_path;
use crate::types::StopSignal;

/// Command-line arguments for `rigwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rigwatch",
    version,
    about = "Supervise a mining process and stream its hash rate, errors and exits as JSON.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Rigwatch.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Override `[adapter].backend` (xmr-stak, xmrig).
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    pub backend: Option<BackendKind>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RIGWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved command line, but don't spawn
    /// anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Signal sent to the miner on Ctrl-C (term, int, kill).
    ///
    /// Overrides `[adapter].stop_signal`.
    #[arg(long, value_name = "SIGNAL", value_parser = parse_stop_signal)]
    pub stop_signal: Option<StopSignal>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_backend(s: &str) -> Result<BackendKind, String> {
    s.parse()
}

fn parse_stop_signal(s: &str) -> Result<StopSignal, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
