// src/config/validate.rs

use tracing::warn;

use crate::backend::BackendKind;
use crate::config::model::{ConfigFile, RawConfigFile, WorkloadConfig};
use crate::errors::{Result, RigwatchError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RigwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_workload(&raw.workload)?;
        warn_on_unused_fields(raw.adapter.backend, &raw.workload);
        Ok(ConfigFile::new_unchecked(raw.adapter, raw.workload))
    }
}

/// Check the parts of a workload that no launch could ever succeed without.
pub fn validate_workload(workload: &WorkloadConfig) -> Result<()> {
    require_non_empty("host", &workload.host)?;
    require_non_empty("algorithm_id", &workload.algorithm_id)?;
    require_non_empty("pool_user", &workload.pool_user)?;

    if workload.port == 0 {
        return Err(RigwatchError::ConfigError(
            "[workload].port must be >= 1 (got 0)".to_string(),
        ));
    }

    if workload.workload_dir.as_os_str().is_empty() {
        return Err(RigwatchError::ConfigError(
            "[workload].workload_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RigwatchError::ConfigError(format!(
            "[workload].{field} must not be empty"
        )));
    }
    Ok(())
}

fn warn_on_unused_fields(backend: BackendKind, workload: &WorkloadConfig) {
    if backend == BackendKind::Xmrig && workload.architecture.is_some() {
        warn!(
            backend = %backend,
            "[workload].architecture is ignored by this backend"
        );
    }
    if backend == BackendKind::XmrStak && !workload.settings.is_empty() {
        warn!(
            backend = %backend,
            "[workload.settings] is ignored by this backend"
        );
    }
}
