// tests/adapter_fake_launcher.rs

use std::sync::Arc;

use rigwatch::fs::mock::MockFileSystem;
use rigwatch::{Adapter, AdapterEvent, AdapterEvents, BackendKind, EnvMap, LogEvent, StopSignal};
use rigwatch_test_utils::builders::WorkloadConfigBuilder;
use rigwatch_test_utils::fake_launcher::{FakeLauncher, FakeProcesses};
use rigwatch_test_utils::{assert_no_event, init_tracing, next_event, with_timeout};

const DIR: &str = "/opt/miner";

fn adapter(backend: BackendKind, fs: MockFileSystem) -> (Adapter, AdapterEvents, FakeProcesses) {
    init_tracing();
    let (launcher, processes) = FakeLauncher::new();
    let (builder, classifier) = backend.strategies();
    let (adapter, events) =
        Adapter::with_parts(backend.as_str(), builder, classifier, Arc::new(fs), launcher);
    (adapter, events, processes)
}

fn installed(executable: &str) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(format!("{DIR}/{executable}"));
    fs
}

async fn expect_start(events: &mut AdapterEvents) -> Vec<String> {
    match next_event(events).await {
        AdapterEvent::Start { args } => args,
        other => panic!("expected start, got {other:?}"),
    }
}

#[tokio::test]
async fn start_emits_args_and_parses_hash_rate() {
    let (adapter, mut events, processes) = adapter(BackendKind::XmrStak, installed("xmr-stak-rx"));

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    let args = expect_start(&mut events).await;
    assert!(args.contains(&"--noTest".to_string()));

    let generation = processes.last_generation().unwrap();
    processes.stdout(generation, b"Totals (ALL):  ");
    processes.stdout(generation, b" 825.7 820.1 0.0 H/s\n");

    assert_eq!(
        next_event(&mut events).await,
        AdapterEvent::Log {
            log: LogEvent::hash_rate(825.7)
        }
    );

    adapter.join().await;
}

#[tokio::test]
async fn launch_spec_augments_library_path_without_touching_template() {
    let (adapter, mut events, processes) = adapter(BackendKind::Xmrig, installed("xmrig"));

    let template: EnvMap = [("LD_LIBRARY_PATH", "/usr/lib")].into_iter().collect();
    adapter.start(
        WorkloadConfigBuilder::new()
            .algorithm("cryptonight-lite")
            .setting("threads", 2i64)
            .build(),
        template.clone(),
    );
    expect_start(&mut events).await;

    let spec = &processes.specs()[0];
    assert_eq!(spec.program, std::path::Path::new(DIR).join("xmrig"));
    assert_eq!(spec.env.get("LD_LIBRARY_PATH"), Some("/usr/lib:/opt/miner"));
    assert_eq!(template.get("LD_LIBRARY_PATH"), Some("/usr/lib"));
    assert!(spec.args.windows(2).any(|w| w == ["--threads", "2"]));

    adapter.join().await;
}

#[tokio::test]
async fn crash_is_reported_then_restarted() {
    let (adapter, mut events, processes) = adapter(BackendKind::XmrStak, installed("xmr-stak-rx"));

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    let first_args = expect_start(&mut events).await;
    let first = processes.last_generation().unwrap();

    processes.exit(first, Some(1));
    assert_eq!(
        next_event(&mut events).await,
        AdapterEvent::Exit { code: Some(1) }
    );
    let second_args = expect_start(&mut events).await;
    assert_eq!(first_args, second_args);
    assert_eq!(processes.launch_count(), 2);
    assert!(processes.is_released(first));

    adapter.join().await;
}

#[tokio::test]
async fn stop_signals_the_process_and_suppresses_restart() {
    let (adapter, mut events, processes) = adapter(BackendKind::XmrStak, installed("xmr-stak-rx"));

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    expect_start(&mut events).await;
    let generation = processes.last_generation().unwrap();

    adapter.stop(StopSignal::Int);
    let signals = with_timeout(async {
        loop {
            let signals = processes.signals(generation);
            if !signals.is_empty() {
                return signals;
            }
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert_eq!(signals, vec![StopSignal::Int]);

    processes.exit(generation, None);
    assert_eq!(next_event(&mut events).await, AdapterEvent::Exit { code: None });
    assert_no_event(&mut events).await;
    assert_eq!(processes.launch_count(), 1);

    adapter.join().await;
}

#[tokio::test]
async fn stop_when_idle_emits_nothing() {
    let (adapter, mut events, processes) = adapter(BackendKind::XmrStak, installed("xmr-stak-rx"));

    adapter.stop(StopSignal::Term);
    assert_no_event(&mut events).await;
    assert_eq!(processes.launch_count(), 0);

    adapter.join().await;
}

#[tokio::test]
async fn start_twice_spawns_once() {
    let (adapter, mut events, processes) = adapter(BackendKind::XmrStak, installed("xmr-stak-rx"));

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    expect_start(&mut events).await;
    assert_no_event(&mut events).await;
    assert_eq!(processes.launch_count(), 1);

    adapter.join().await;
}

#[tokio::test]
async fn missing_executable_yields_error_then_exit() {
    let fs = MockFileSystem::new();
    fs.add_dir(DIR);
    let (adapter, mut events, processes) = adapter(BackendKind::XmrStak, fs);

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    match next_event(&mut events).await {
        AdapterEvent::Error { message } => assert!(message.contains("xmr-stak-rx"), "{message}"),
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(next_event(&mut events).await, AdapterEvent::Exit { code: None });
    assert_no_event(&mut events).await;
    assert_eq!(processes.launch_count(), 0);

    adapter.join().await;
}

#[tokio::test]
async fn spawn_failure_yields_error_then_exit_without_retry() {
    let (adapter, mut events, processes) = adapter(BackendKind::Xmrig, installed("xmrig"));
    processes.fail_next_spawn();

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    assert!(matches!(next_event(&mut events).await, AdapterEvent::Error { .. }));
    assert_eq!(next_event(&mut events).await, AdapterEvent::Exit { code: None });
    assert_no_event(&mut events).await;
    assert_eq!(processes.launch_count(), 1);

    adapter.join().await;
}

#[tokio::test]
async fn stderr_lines_become_error_events() {
    let (adapter, mut events, processes) = adapter(BackendKind::Xmrig, installed("xmrig"));

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    expect_start(&mut events).await;
    let generation = processes.last_generation().unwrap();

    processes.stderr(generation, b"segfault in ");
    processes.stderr(generation, b"worker\r\n\n");
    assert_eq!(
        next_event(&mut events).await,
        AdapterEvent::Error {
            message: "segfault in worker".to_string()
        }
    );
    assert_no_event(&mut events).await;

    adapter.join().await;
}

#[tokio::test]
async fn xmrig_lines_are_classified() {
    let (adapter, mut events, processes) = adapter(BackendKind::Xmrig, installed("xmrig"));

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    expect_start(&mut events).await;
    let generation = processes.last_generation().unwrap();

    processes.stdout(
        generation,
        b"RES|2024|speed|1234.5|H/s\nERR|2024|pool timed out\nNET|2024|use pool\n",
    );
    assert_eq!(
        next_event(&mut events).await,
        AdapterEvent::Log {
            log: LogEvent::hash_rate(1234.5)
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        AdapterEvent::Log {
            log: LogEvent::error("pool timed out")
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        AdapterEvent::Log {
            log: LogEvent::log("use pool")
        }
    );

    adapter.join().await;
}

#[tokio::test]
async fn shutdown_releases_the_process_and_closes_events() {
    let (adapter, mut events, processes) = adapter(BackendKind::XmrStak, installed("xmr-stak-rx"));

    adapter.start(WorkloadConfigBuilder::new().build(), EnvMap::new());
    expect_start(&mut events).await;
    let generation = processes.last_generation().unwrap();

    adapter.join().await;
    assert!(processes.is_released(generation));
    assert_eq!(with_timeout(events.recv()).await, None);
}
