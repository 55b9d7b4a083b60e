// src/backend/xmrig.rs

//! xmrig backend.
//!
//! The build we ship reports in a pipe-delimited machine format:
//!
//! ```text
//! RES|<ts>|speed|123.4
//! ERR|<ts>|connect error: "Connection refused"
//! LOG|<ts>|use pool pool.example.com:3333
//! ```

use crate::backend::{Classifier, EnvMap, LaunchBuilder, LaunchSpec, library_env, resolve_executable};
use crate::config::WorkloadConfig;
use crate::errors::LaunchError;
use crate::events::LogEvent;
use crate::fs::FileSystem;
use crate::parse::leading_float;

pub const EXECUTABLE: &str = "xmrig";

/// `[workload.settings]` key forwarded as `--cpu-priority`.
pub const SETTING_CPU_PRIORITY: &str = "cpu_priority";
/// `[workload.settings]` key forwarded as `--threads`.
pub const SETTING_THREADS: &str = "threads";

const LITE_ALGORITHM: &str = "cryptonight-lite";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmrigLaunch;

impl LaunchBuilder for XmrigLaunch {
    fn build(
        &self,
        workload: &WorkloadConfig,
        env: &EnvMap,
        fs: &dyn FileSystem,
    ) -> Result<LaunchSpec, LaunchError> {
        let program = resolve_executable(fs, workload, EXECUTABLE)?;

        let algorithm = if workload.algorithm_id == LITE_ALGORITHM {
            "cryptonight-lite"
        } else {
            "cryptonight"
        };

        let mut args: Vec<String> = vec![
            "-o".into(),
            workload.pool_address(),
            "-u".into(),
            workload.pool_user.clone(),
            "-a".into(),
            algorithm.into(),
        ];

        if let Some(priority) = workload.settings.get(SETTING_CPU_PRIORITY) {
            args.push("--cpu-priority".into());
            args.push(priority.to_string());
        }
        if let Some(threads) = workload.settings.get(SETTING_THREADS) {
            args.push("--threads".into());
            args.push(threads.to_string());
        }

        Ok(LaunchSpec {
            program,
            args,
            env: library_env(workload.platform, env, &workload.workload_dir),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmrigClassifier;

impl Classifier for XmrigClassifier {
    fn classify(&self, line: &str) -> LogEvent {
        let fields: Vec<&str> = line.split('|').collect();

        match fields.as_slice() {
            ["ERR", _, message @ ..] if !message.is_empty() => {
                LogEvent::error(message.join(" ").trim())
            }
            ["RES", _, "speed", rate, ..] => LogEvent::hash_rate(leading_float(rate)),
            _ => LogEvent::log(fields.get(2..).unwrap_or_default().join(" ").trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadSettings;
    use crate::fs::mock::MockFileSystem;
    use crate::types::Platform;
    use std::path::PathBuf;

    fn workload(algorithm: &str, settings: WorkloadSettings) -> WorkloadConfig {
        WorkloadConfig {
            platform: Platform::Linux,
            host: "10.0.0.2".into(),
            port: 5555,
            algorithm_id: algorithm.into(),
            architecture: None,
            pool_user: "acct".into(),
            workload_dir: PathBuf::from("/opt/xmrig"),
            settings,
        }
    }

    fn fs() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/xmrig/xmrig");
        fs
    }

    #[test]
    fn classifies_speed_results() {
        assert_eq!(XmrigClassifier.classify("RES|x|speed|123.4"), LogEvent::hash_rate(123.4));
        assert_eq!(XmrigClassifier.classify("RES|x|speed|n/a"), LogEvent::hash_rate(0.0));
    }

    #[test]
    fn classifies_errors() {
        assert_eq!(XmrigClassifier.classify("ERR|x|bad thing"), LogEvent::error("bad thing"));
        assert_eq!(
            XmrigClassifier.classify("ERR|x|pool| rejected "),
            LogEvent::error("pool  rejected")
        );
    }

    #[test]
    fn other_lines_are_logs() {
        assert_eq!(
            XmrigClassifier.classify("LOG|x|use pool 10.0.0.2:5555"),
            LogEvent::log("use pool 10.0.0.2:5555")
        );
        assert_eq!(XmrigClassifier.classify("RES|x|shares|3/0"), LogEvent::log("shares 3/0"));
    }

    #[test]
    fn short_lines_fall_back_to_logs() {
        assert_eq!(XmrigClassifier.classify(""), LogEvent::log(""));
        assert_eq!(XmrigClassifier.classify("ERR|x"), LogEvent::log(""));
        assert_eq!(XmrigClassifier.classify("RES|x|speed"), LogEvent::log("speed"));
        assert_eq!(XmrigClassifier.classify("plain text"), LogEvent::log(""));
    }

    #[test]
    fn builds_minimal_launch() {
        let spec = XmrigLaunch
            .build(&workload("cryptonight", WorkloadSettings::new()), &EnvMap::new(), &fs())
            .unwrap();
        assert_eq!(spec.args, vec!["-o", "10.0.0.2:5555", "-u", "acct", "-a", "cryptonight"]);
    }

    #[test]
    fn lite_only_for_exact_algorithm_id() {
        let lite = XmrigLaunch
            .build(&workload("cryptonight-lite", WorkloadSettings::new()), &EnvMap::new(), &fs())
            .unwrap();
        assert_eq!(lite.args[5], "cryptonight-lite");

        let other = XmrigLaunch
            .build(&workload("cryptonight-heavy", WorkloadSettings::new()), &EnvMap::new(), &fs())
            .unwrap();
        assert_eq!(other.args[5], "cryptonight");
    }

    #[test]
    fn forwards_priority_then_threads() {
        let mut settings = WorkloadSettings::new();
        settings.insert(SETTING_THREADS, 4i64);
        settings.insert(SETTING_CPU_PRIORITY, 2i64);
        settings.insert("unrelated", "ignored");

        let spec = XmrigLaunch
            .build(&workload("cryptonight", settings), &EnvMap::new(), &fs())
            .unwrap();
        assert_eq!(
            spec.args[6..],
            ["--cpu-priority", "2", "--threads", "4"]
        );
        assert_eq!(spec.env.get("LD_LIBRARY_PATH"), Some("/opt/xmrig"));
    }

    #[test]
    fn missing_workload_dir_is_a_launch_error() {
        let err = XmrigLaunch
            .build(
                &workload("cryptonight", WorkloadSettings::new()),
                &EnvMap::new(),
                &MockFileSystem::new(),
            )
            .unwrap_err();
        assert!(matches!(err, LaunchError::WorkloadDirMissing(_)));
    }
}
