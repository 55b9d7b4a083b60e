// src/adapter.rs

//! The adapter façade hosts interact with.
//!
//! An [`Adapter`] supervises one miner process for one backend. Its
//! methods never block and never fail: everything that happens afterwards,
//! including launch failures, is reported on the paired [`AdapterEvents`]
//! stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

use crate::backend::{BackendKind, Classifier, EnvMap, LaunchBuilder};
use crate::config::WorkloadConfig;
use crate::engine::{StartRequest, SupervisorCore, SupervisorInput, SupervisorRuntime};
use crate::events::AdapterEvent;
use crate::exec::process_runner::DEFAULT_OUTPUT_DRAIN;
use crate::exec::{OwnedPid, ProcessLauncher, TokioLauncher};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::StopSignal;

/// Knobs for [`Adapter::new`].
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// How long to keep reading a dead process's pipes before reporting its
    /// exit.
    pub output_drain: Duration,
    /// Filesystem used to check the miner executable before each launch.
    pub fs: Arc<dyn FileSystem>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            output_drain: DEFAULT_OUTPUT_DRAIN,
            fs: Arc::new(RealFileSystem),
        }
    }
}

/// Host-held handle to one supervised miner.
///
/// Owns at most one live child process at a time. Dropping the adapter (or
/// calling [`Adapter::shutdown`]) kills that child.
#[derive(Debug)]
pub struct Adapter {
    name: String,
    inputs: mpsc::UnboundedSender<SupervisorInput>,
    owned_pid: OwnedPid,
    task: Option<JoinHandle<()>>,
}

/// Receiving side of an adapter's `start` / `log` / `error` / `exit`
/// channels.
#[derive(Debug)]
pub struct AdapterEvents {
    rx: mpsc::UnboundedReceiver<AdapterEvent>,
}

impl AdapterEvents {
    /// Next event; `None` once the adapter has shut down and every event was
    /// delivered.
    pub async fn recv(&mut self) -> Option<AdapterEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<AdapterEvent> {
        self.rx.try_recv().ok()
    }
}

impl Adapter {
    /// Adapter for a built-in backend spawning real processes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(backend: BackendKind, options: AdapterOptions) -> (Self, AdapterEvents) {
        let (builder, classifier) = backend.strategies();
        Self::with_parts(
            backend.as_str(),
            builder,
            classifier,
            options.fs,
            TokioLauncher::new(options.output_drain),
        )
    }

    /// Adapter assembled from explicit strategies and launcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_parts<L: ProcessLauncher>(
        name: impl Into<String>,
        builder: Box<dyn LaunchBuilder>,
        classifier: Box<dyn Classifier>,
        fs: Arc<dyn FileSystem>,
        launcher: L,
    ) -> (Self, AdapterEvents) {
        let name = name.into();
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let owned_pid = OwnedPid::new();

        let core = SupervisorCore::new(builder, classifier, fs);
        let runtime = SupervisorRuntime::new(
            core,
            inputs_rx,
            &inputs_tx,
            events_tx,
            launcher,
            owned_pid.clone(),
        );
        let task = tokio::spawn(runtime.run().instrument(info_span!("adapter", backend = %name)));

        let adapter = Self {
            name,
            inputs: inputs_tx,
            owned_pid,
            task: Some(task),
        };
        (adapter, AdapterEvents { rx: events_rx })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// PID of the live child, if it has one and has not been reaped yet.
    pub fn pid(&self) -> Option<u32> {
        self.owned_pid.get()
    }

    /// Declare that the miner should run with `workload`.
    ///
    /// A no-op while a process is already owned. Launch problems arrive as
    /// an `error` event followed by an `exit` event without a code.
    pub fn start(&self, workload: WorkloadConfig, env: EnvMap) {
        self.send(SupervisorInput::Start(StartRequest { workload, env }));
    }

    /// Declare that the miner should not run, and signal it if it does.
    ///
    /// Returns immediately; the matching `exit` event confirms termination.
    pub fn stop(&self, signal: StopSignal) {
        self.send(SupervisorInput::Stop(signal));
    }

    /// Kill any owned child right now and stop supervising.
    ///
    /// Meant for the host's own shutdown path. Idempotent; the adapter
    /// accepts no further work afterwards.
    pub fn shutdown(&self) {
        // Must be queued before the killed child's exit can be.
        self.send(SupervisorInput::Shutdown);
        self.owned_pid.kill_now();
    }

    /// Shut down and wait for the supervisor task to finish.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(adapter = %self.name, error = %e, "supervisor task ended abnormally");
            }
        }
    }

    fn send(&self, input: SupervisorInput) {
        if self.inputs.send(input).is_err() {
            debug!(adapter = %self.name, "supervisor already stopped; request dropped");
        }
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
