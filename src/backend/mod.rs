// src/backend/mod.rs

//! Per-backend strategies.
//!
//! Every mining backend is described by two pluggable pieces:
//!
//! - a [`LaunchBuilder`], mapping a [`WorkloadConfig`] to the executable,
//!   argument list and environment the miner must be started with;
//! - a [`Classifier`], turning one line of the miner's stdout into a
//!   [`LogEvent`].
//!
//! [`BackendKind::strategies`] picks the pair for a backend identifier, so
//! the adapter itself has a single code path for all backends.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::config::WorkloadConfig;
use crate::errors::LaunchError;
use crate::events::LogEvent;
use crate::fs::FileSystem;
use crate::types::Platform;

pub mod xmr_stak;
pub mod xmrig;

pub use xmr_stak::{XmrStakClassifier, XmrStakLaunch};
pub use xmrig::{XmrigClassifier, XmrigLaunch};

/// Everything needed to spawn one miner process.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Complete environment of the child (not merged with ours).
    pub env: EnvMap,
}

/// Builds the launch parameters for one backend.
pub trait LaunchBuilder: Send + Sync + fmt::Debug {
    /// Resolve `workload` into a [`LaunchSpec`].
    ///
    /// `env` is the host's environment template; it is never modified, the
    /// returned spec carries an augmented copy. Must fail without side
    /// effects when the executable is missing or unreadable.
    fn build(
        &self,
        workload: &WorkloadConfig,
        env: &EnvMap,
        fs: &dyn FileSystem,
    ) -> Result<LaunchSpec, LaunchError>;
}

/// Maps a single, complete, escape-free output line to an event.
///
/// Must be total: unknown shapes become [`LogEvent::Log`].
pub trait Classifier: Send + Sync + fmt::Debug {
    fn classify(&self, line: &str) -> LogEvent;
}

/// Backend identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "xmr-stak")]
    XmrStak,
    #[serde(rename = "xmrig")]
    Xmrig,
}

impl BackendKind {
    /// The (launch builder, classifier) pair for this backend.
    pub fn strategies(self) -> (Box<dyn LaunchBuilder>, Box<dyn Classifier>) {
        match self {
            BackendKind::XmrStak => (Box::new(XmrStakLaunch), Box::new(XmrStakClassifier)),
            BackendKind::Xmrig => (Box::new(XmrigLaunch), Box::new(XmrigClassifier)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::XmrStak => "xmr-stak",
            BackendKind::Xmrig => "xmrig",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xmr-stak" | "xmrstak" | "xmr-stak-rx" => Ok(BackendKind::XmrStak),
            "xmrig" => Ok(BackendKind::Xmrig),
            other => Err(format!(
                "invalid backend: {other} (expected \"xmr-stak\" or \"xmrig\")"
            )),
        }
    }
}

/// Environment variables for a child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap(BTreeMap<String, String>);

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of this process's environment. Entries that are not valid
    /// UTF-8 are skipped.
    pub fn from_current() -> Self {
        Self(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append `dir` to a separator-delimited search path.
    ///
    /// When `case_insensitive` is set, an existing key differing only in
    /// case (Windows' `Path`) is extended instead of adding a second one.
    pub fn append_path_like(&mut self, key: &str, dir: &Path, separator: char, case_insensitive: bool) {
        let existing_key = if case_insensitive {
            self.0.keys().find(|k| k.eq_ignore_ascii_case(key)).cloned()
        } else {
            self.0.contains_key(key).then(|| key.to_string())
        };
        let key = existing_key.unwrap_or_else(|| key.to_string());
        let dir = dir.to_string_lossy();

        let value = match self.0.get(&key) {
            Some(current) if !current.is_empty() => format!("{current}{separator}{dir}"),
            _ => dir.into_owned(),
        };
        self.0.insert(key, value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Copy `template` and make `workload_dir` visible to the dynamic loader.
///
/// - `win`: appended to `PATH` with `;`
/// - `linux`: appended to `LD_LIBRARY_PATH` with `:`
/// - `mac`: unchanged
pub fn library_env(platform: Platform, template: &EnvMap, workload_dir: &Path) -> EnvMap {
    let mut env = template.clone();
    match platform {
        Platform::Win => env.append_path_like("PATH", workload_dir, ';', true),
        Platform::Linux => env.append_path_like("LD_LIBRARY_PATH", workload_dir, ':', false),
        Platform::Mac => {}
    }
    env
}

/// Locate `<workload_dir>/<name>[.exe]` and make sure it can be read.
pub fn resolve_executable(
    fs: &dyn FileSystem,
    workload: &WorkloadConfig,
    base_name: &str,
) -> Result<PathBuf, LaunchError> {
    let dir = &workload.workload_dir;
    if !fs.is_dir(dir) {
        return Err(LaunchError::WorkloadDirMissing(dir.clone()));
    }

    let file_name = match workload.platform {
        Platform::Win => format!("{base_name}.exe"),
        Platform::Linux | Platform::Mac => base_name.to_string(),
    };
    let path = dir.join(file_name);

    if !fs.is_file(&path) {
        return Err(LaunchError::ExecutableMissing(path));
    }
    fs.check_readable(&path)
        .map_err(|e| LaunchError::ExecutableUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    Ok(path)
}
