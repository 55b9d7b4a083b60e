// src/backend/xmr_stak.rs

//! xmr-stak-rx backend.
//!
//! Output looks like
//!
//! ```text
//! [2019-11-25 15:27:28] : ERROR: no miner backend enabled.
//! Totals (ALL):    825.7  697.8    0.0 H/s
//! ```
//!
//! i.e. a two-token timestamp and a `:` separator before the message, and an
//! unprefixed hash-rate report every `--h-print-time` seconds.

use crate::backend::{EnvMap, LaunchBuilder, LaunchSpec, library_env, resolve_executable};
use crate::backend::Classifier;
use crate::config::WorkloadConfig;
use crate::errors::LaunchError;
use crate::events::LogEvent;
use crate::fs::FileSystem;
use crate::parse::leading_float;
use crate::types::Architecture;

pub const EXECUTABLE: &str = "xmr-stak-rx";

/// Seconds between hash-rate reports requested from the miner.
const HASHRATE_PRINT_INTERVAL: &str = "1";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmrStakLaunch;

impl LaunchBuilder for XmrStakLaunch {
    fn build(
        &self,
        workload: &WorkloadConfig,
        env: &EnvMap,
        fs: &dyn FileSystem,
    ) -> Result<LaunchSpec, LaunchError> {
        let program = resolve_executable(fs, workload, EXECUTABLE)?;

        let mut args: Vec<String> = vec![
            "-o".into(),
            workload.pool_address(),
            "-u".into(),
            workload.pool_user.clone(),
            "-p".into(),
            "x".into(),
            "-r".into(),
            "worker".into(),
            "--noTest".into(),
            "--h-print-time".into(),
            HASHRATE_PRINT_INTERVAL.into(),
            "--currency".into(),
            workload.algorithm_id.clone(),
        ];
        args.extend(
            device_exclusions(workload.architecture)
                .iter()
                .map(|flag| flag.to_string()),
        );

        Ok(LaunchSpec {
            program,
            args,
            env: library_env(workload.platform, env, &workload.workload_dir),
        })
    }
}

/// Flags disabling every device class except the selected one.
fn device_exclusions(architecture: Option<Architecture>) -> &'static [&'static str] {
    match architecture {
        Some(Architecture::Cpu) => &["--noAMD", "--noNVIDIA"],
        Some(Architecture::Nvidia) => &["--noAMD", "--noCPU"],
        Some(Architecture::Amd) => &["--noCPU", "--noNVIDIA"],
        None => &[],
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmrStakClassifier;

impl Classifier for XmrStakClassifier {
    fn classify(&self, line: &str) -> LogEvent {
        let tokens: Vec<String> = line
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        let token = |i: usize| tokens.get(i).map(String::as_str);

        if token(0) == Some("totals") && token(1) == Some("(all):") {
            if let Some(rate) = token(2) {
                return LogEvent::hash_rate(leading_float(rate));
            }
        }

        if token(3) == Some("error:") {
            return LogEvent::error(after_fields(line, 4).trim());
        }

        LogEvent::log(after_fields(line, 3).trim())
    }
}

/// Text after the first `n` single-space separated fields, verbatim.
fn after_fields(line: &str, n: usize) -> &str {
    line.splitn(n + 1, ' ').nth(n).unwrap_or("")
}
