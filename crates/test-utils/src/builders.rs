use std::path::PathBuf;

use rigwatch::config::{SettingValue, WorkloadConfig, WorkloadSettings};
use rigwatch::{Architecture, Platform};

/// Builder for `WorkloadConfig` to simplify test setup.
///
/// Defaults to a linux workload for `pool.example.com:3333` living in
/// `/opt/miner`.
pub struct WorkloadConfigBuilder {
    workload: WorkloadConfig,
}

impl WorkloadConfigBuilder {
    pub fn new() -> Self {
        Self {
            workload: WorkloadConfig {
                platform: Platform::Linux,
                host: "pool.example.com".to_string(),
                port: 3333,
                algorithm_id: "monero".to_string(),
                architecture: None,
                pool_user: "wallet.worker".to_string(),
                workload_dir: PathBuf::from("/opt/miner"),
                settings: WorkloadSettings::new(),
            },
        }
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.workload.platform = platform;
        self
    }

    pub fn pool(mut self, host: &str, port: u16) -> Self {
        self.workload.host = host.to_string();
        self.workload.port = port;
        self
    }

    pub fn algorithm(mut self, algorithm_id: &str) -> Self {
        self.workload.algorithm_id = algorithm_id.to_string();
        self
    }

    pub fn architecture(mut self, architecture: Architecture) -> Self {
        self.workload.architecture = Some(architecture);
        self
    }

    pub fn pool_user(mut self, user: &str) -> Self {
        self.workload.pool_user = user.to_string();
        self
    }

    pub fn workload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workload.workload_dir = dir.into();
        self
    }

    pub fn setting(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.workload.settings.insert(key, value);
        self
    }

    pub fn build(self) -> WorkloadConfig {
        self.workload
    }
}

impl Default for WorkloadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
