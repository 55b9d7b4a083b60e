// src/lib.rs

pub mod adapter;
pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod parse;
pub mod types;

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub use crate::adapter::{Adapter, AdapterEvents, AdapterOptions};
pub use crate::backend::{BackendKind, EnvMap, LaunchSpec};
pub use crate::config::WorkloadConfig;
pub use crate::events::{AdapterEvent, HASH_RATE_UNIT, LogEvent};
pub use crate::types::{Architecture, Platform, StopSignal};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (+ CLI overrides)
/// - a launch preflight, so a broken install fails fast
/// - one adapter supervising the miner
/// - the JSON event stream on stdout
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let (mut adapter_cfg, workload) = cfg.into_parts();

    if let Some(backend) = args.backend {
        adapter_cfg.backend = backend;
    }
    let stop_signal = args.stop_signal.unwrap_or(adapter_cfg.stop_signal);
    let backend = adapter_cfg.backend;

    let env = EnvMap::from_current();
    let (builder, _) = backend.strategies();
    let spec = builder.build(&workload, &env, &RealFileSystem)?;

    if args.dry_run {
        print_dry_run(backend, &spec);
        return Ok(());
    }

    let options = AdapterOptions {
        output_drain: adapter_cfg.output_drain(),
        ..AdapterOptions::default()
    };
    let (adapter, mut events) = Adapter::new(backend, options);
    info!(adapter = adapter.name(), pool = %workload.pool_address(), "starting miner");
    adapter.start(workload, env);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;
    let mut running = false;

    loop {
        tokio::select! {
            res = &mut ctrl_c, if !stopping => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!(signal = ?stop_signal, "stopping miner");
                stopping = true;
                adapter.stop(stop_signal);
                if !running {
                    break;
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                print_event(&event)?;
                match event {
                    AdapterEvent::Start { .. } => {
                        running = true;
                        debug!(pid = ?adapter.pid(), "miner running");
                    }
                    AdapterEvent::Exit { .. } => {
                        running = false;
                        if stopping {
                            break;
                        }
                    }
                    AdapterEvent::Log { .. } | AdapterEvent::Error { .. } => {}
                }
            }
        }
    }

    adapter.join().await;
    debug!("adapter shut down");
    Ok(())
}

/// One JSON object per line.
fn print_event(event: &AdapterEvent) -> Result<()> {
    let line = serde_json::to_string(event)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}

fn print_dry_run(backend: BackendKind, spec: &LaunchSpec) {
    println!("rigwatch dry-run");
    println!("  backend = {backend}");
    println!("  program = {}", spec.program.display());
    println!("  args = {:?}", spec.args);
    for key in ["PATH", "LD_LIBRARY_PATH"] {
        if let Some(value) = spec.env.get(key) {
            println!("  env.{key} = {value}");
        }
    }

    debug!("dry-run complete (no process spawned)");
}
