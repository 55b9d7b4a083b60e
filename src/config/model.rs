// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::backend::BackendKind;
use crate::types::{Architecture, Platform, StopSignal};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [adapter]
/// backend = "xmrig"
/// output_drain_ms = 500
///
/// [workload]
/// platform = "linux"
/// host = "pool.example.com"
/// port = 3333
/// algorithm_id = "cryptonight"
/// pool_user = "wallet.worker"
/// workload_dir = "/opt/miners/xmrig"
///
/// [workload.settings]
/// threads = 4
/// cpu_priority = 2
/// ```
///
/// `[adapter]` is optional; `[workload]` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub adapter: AdapterSection,

    pub workload: WorkloadConfig,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    adapter: AdapterSection,
    workload: WorkloadConfig,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(adapter: AdapterSection, workload: WorkloadConfig) -> Self {
        Self { adapter, workload }
    }

    pub fn adapter(&self) -> &AdapterSection {
        &self.adapter
    }

    pub fn workload(&self) -> &WorkloadConfig {
        &self.workload
    }

    pub fn into_parts(self) -> (AdapterSection, WorkloadConfig) {
        (self.adapter, self.workload)
    }
}

/// `[adapter]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterSection {
    /// `"xmr-stak"` (default) or `"xmrig"`.
    #[serde(default)]
    pub backend: BackendKind,

    /// How long to keep reading a dead process's pipes before reporting its
    /// exit.
    #[serde(default = "default_output_drain_ms")]
    pub output_drain_ms: u64,

    /// Signal sent to the miner when rigwatch itself is asked to stop.
    #[serde(default)]
    pub stop_signal: StopSignal,
}

fn default_output_drain_ms() -> u64 {
    500
}

impl AdapterSection {
    pub fn output_drain(&self) -> Duration {
        Duration::from_millis(self.output_drain_ms)
    }
}

impl Default for AdapterSection {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            output_drain_ms: default_output_drain_ms(),
            stop_signal: StopSignal::default(),
        }
    }
}

/// Parameters of one mining job.
///
/// Supplied fresh on every `start`; the adapter only borrows from it while
/// building the launch spec and keeps a copy for automatic restarts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkloadConfig {
    /// Defaults to the platform rigwatch was built for.
    #[serde(default)]
    pub platform: Platform,

    pub host: String,

    pub port: u16,

    /// Currency / algorithm identifier understood by the miner
    /// (e.g. `"monero"`, `"cryptonight-lite"`).
    pub algorithm_id: String,

    /// Device class; only the xmr-stak backend uses it.
    #[serde(default)]
    pub architecture: Option<Architecture>,

    /// Pool login.
    pub pool_user: String,

    /// Directory holding the miner executable and its shared libraries.
    pub workload_dir: PathBuf,

    /// Optional miner tunables (`threads`, `cpu_priority`, ...).
    #[serde(default, alias = "workload_settings")]
    pub settings: WorkloadSettings,
}

impl WorkloadConfig {
    /// `host:port` as passed to `-o`.
    pub fn pool_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Free-form tunables keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct WorkloadSettings(BTreeMap<String, SettingValue>);

impl WorkloadSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SettingValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.0.iter()
    }
}

/// A single scalar setting value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Integer(v) => write!(f, "{v}"),
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::Bool(v) => write!(f, "{v}"),
            SettingValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Integer(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}
