// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Operating system family the workload binaries were built for.
///
/// Decides the executable file name and which library search path gets the
/// workload directory appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Win,
    Linux,
    Mac,
}

impl Platform {
    /// Platform of the machine this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Win
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "win" | "windows" => Ok(Platform::Win),
            "linux" => Ok(Platform::Linux),
            "mac" | "macos" | "darwin" => Ok(Platform::Mac),
            other => Err(format!(
                "invalid platform: {other} (expected \"win\", \"linux\" or \"mac\")"
            )),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Win => "win",
            Platform::Linux => "linux",
            Platform::Mac => "mac",
        };
        f.write_str(s)
    }
}

/// Hardware class a workload is pinned to.
///
/// Only the xmr-stak backend understands this; it turns into `--noXXX`
/// exclusion flags for the other two device classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Cpu,
    Nvidia,
    Amd,
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Architecture::Cpu),
            "nvidia" => Ok(Architecture::Nvidia),
            "amd" => Ok(Architecture::Amd),
            other => Err(format!(
                "invalid architecture: {other} (expected \"cpu\", \"nvidia\" or \"amd\")"
            )),
        }
    }
}

/// Signal delivered to the child by `stop`.
///
/// On non-unix targets every variant degrades to a forced kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopSignal {
    #[default]
    Term,
    Int,
    Kill,
}

impl FromStr for StopSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "term" | "sigterm" => Ok(StopSignal::Term),
            "int" | "sigint" => Ok(StopSignal::Int),
            "kill" | "sigkill" => Ok(StopSignal::Kill),
            other => Err(format!(
                "invalid stop signal: {other} (expected \"term\", \"int\" or \"kill\")"
            )),
        }
    }
}

#[cfg(unix)]
impl From<StopSignal> for nix::sys::signal::Signal {
    fn from(value: StopSignal) -> Self {
        use nix::sys::signal::Signal;
        match value {
            StopSignal::Term => Signal::SIGTERM,
            StopSignal::Int => Signal::SIGINT,
            StopSignal::Kill => Signal::SIGKILL,
        }
    }
}

/// Which child pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}
