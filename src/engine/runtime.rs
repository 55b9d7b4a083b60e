// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::core::SupervisorCore;
use crate::engine::{Generation, SupervisorCommand, SupervisorInput};
use crate::events::AdapterEvent;
use crate::exec::{OwnedPid, ProcessHandle, ProcessLauncher};

/// Drives the [`SupervisorCore`] in response to [`SupervisorInput`]s and
/// delegates process creation to a [`ProcessLauncher`].
///
/// This is a pure IO shell: it reads inputs from a single channel, so host
/// calls and process callbacks are handled strictly one at a time and in
/// arrival order, and it performs whatever the core decides.
pub struct SupervisorRuntime<L: ProcessLauncher> {
    core: SupervisorCore,
    inputs_rx: mpsc::UnboundedReceiver<SupervisorInput>,
    inputs_tx: mpsc::WeakUnboundedSender<SupervisorInput>,
    events_tx: mpsc::UnboundedSender<AdapterEvent>,
    launcher: L,
    process: Option<(Generation, ProcessHandle)>,
    owned_pid: OwnedPid,
}

impl<L: ProcessLauncher> fmt::Debug for SupervisorRuntime<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorRuntime")
            .field("core", &self.core)
            .field("process", &self.process)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher> SupervisorRuntime<L> {
    /// `inputs_tx` is held weakly: the loop ends once the adapter and every
    /// process task have let go of their senders.
    pub fn new(
        core: SupervisorCore,
        inputs_rx: mpsc::UnboundedReceiver<SupervisorInput>,
        inputs_tx: &mpsc::UnboundedSender<SupervisorInput>,
        events_tx: mpsc::UnboundedSender<AdapterEvent>,
        launcher: L,
        owned_pid: OwnedPid,
    ) -> Self {
        Self {
            core,
            inputs_rx,
            inputs_tx: inputs_tx.downgrade(),
            events_tx,
            launcher,
            process: None,
            owned_pid,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `SupervisorInput`s.
    /// - Feeds them into the core.
    /// - Executes the commands returned by the core (spawn, signal, emit).
    pub async fn run(mut self) {
        info!("supervisor started");

        while let Some(input) = self.inputs_rx.recv().await {
            if !self.handle(input) {
                info!("core requested exit; stopping supervisor");
                break;
            }
        }

        // Dropping the handle kills anything still alive.
        if let Some((generation, _handle)) = self.process.take() {
            debug!(generation, "releasing miner process on supervisor exit");
        }
        self.owned_pid.clear();
        info!(restarts = self.core.restarts(), "supervisor exiting");
    }

    /// Step the core with `input` and with any follow-up inputs the executed
    /// commands produce (spawn results), before looking at the channel
    /// again.
    fn handle(&mut self, input: SupervisorInput) -> bool {
        let mut queue = VecDeque::from([input]);
        let mut keep_running = true;

        while let Some(input) = queue.pop_front() {
            let step = self.core.step(input);
            for command in step.commands {
                if let Some(follow_up) = self.execute_command(command) {
                    queue.push_back(follow_up);
                }
            }
            keep_running &= step.keep_running;
        }

        keep_running
    }

    /// Execute a single command from the core.
    fn execute_command(&mut self, command: SupervisorCommand) -> Option<SupervisorInput> {
        match command {
            SupervisorCommand::Spawn { generation, spec } => {
                let Some(inputs) = self.inputs_tx.upgrade() else {
                    return Some(SupervisorInput::SpawnFailed {
                        generation,
                        error: "adapter is shutting down".to_string(),
                    });
                };
                match self.launcher.launch(generation, &spec, inputs, &self.owned_pid) {
                    Ok(handle) => {
                        let pid = handle.pid();
                        self.process = Some((generation, handle));
                        Some(SupervisorInput::Spawned { generation, pid })
                    }
                    Err(e) => Some(SupervisorInput::SpawnFailed {
                        generation,
                        error: format!("failed to spawn {:?}: {e}", spec.program),
                    }),
                }
            }
            SupervisorCommand::Signal { generation, signal } => {
                match &self.process {
                    Some((owned, handle)) if *owned == generation => {
                        if !handle.signal(signal) {
                            debug!(generation, "process already gone; signal dropped");
                        }
                    }
                    _ => debug!(generation, "no handle for signalled generation"),
                }
                None
            }
            SupervisorCommand::Release { generation } => {
                let released = self.process.take_if(|(owned, _)| *owned == generation);
                if let Some(pid) = released.and_then(|(_, handle)| handle.pid()) {
                    self.owned_pid.clear_if(pid);
                }
                None
            }
            SupervisorCommand::Emit(event) => {
                if self.events_tx.send(event).is_err() {
                    warn!("event receiver dropped; event discarded");
                }
                None
            }
        }
    }
}
