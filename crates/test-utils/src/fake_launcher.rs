use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use rigwatch::LaunchSpec;
use rigwatch::engine::{Generation, SupervisorInput};
use rigwatch::exec::{OwnedPid, ProcessHandle, ProcessLauncher};
use rigwatch::types::{StopSignal, StreamKind};
use tokio::sync::mpsc;

/// A fake launcher that:
/// - records every launch spec it is asked to run
/// - spawns nothing; the test drives output and exits through
///   [`FakeProcesses`].
pub struct FakeLauncher {
    processes: FakeProcesses,
}

impl FakeLauncher {
    pub fn new() -> (Self, FakeProcesses) {
        let processes = FakeProcesses::default();
        (
            Self {
                processes: processes.clone(),
            },
            processes,
        )
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(
        &mut self,
        generation: Generation,
        spec: &LaunchSpec,
        inputs: mpsc::UnboundedSender<SupervisorInput>,
        _owned_pid: &OwnedPid,
    ) -> io::Result<ProcessHandle> {
        let mut state = self.processes.lock();
        state.launches.push((generation, spec.clone()));

        if std::mem::take(&mut state.fail_next_spawn) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "fake spawn refused"));
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        state.live.insert(
            generation,
            FakeProcess {
                inputs,
                control: control_rx,
            },
        );
        // No pid and nothing recorded in the owned cell: there is no OS
        // process for `Adapter::shutdown` to kill.
        Ok(ProcessHandle::new(None, control_tx))
    }
}

struct FakeProcess {
    inputs: mpsc::UnboundedSender<SupervisorInput>,
    control: mpsc::UnboundedReceiver<StopSignal>,
}

#[derive(Default)]
struct FakeState {
    launches: Vec<(Generation, LaunchSpec)>,
    live: BTreeMap<Generation, FakeProcess>,
    fail_next_spawn: bool,
}

/// Test-side view of the processes a [`FakeLauncher`] pretended to spawn.
#[derive(Clone, Default)]
pub struct FakeProcesses {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcesses {
    /// Number of launch attempts, failed ones included.
    pub fn launch_count(&self) -> usize {
        self.lock().launches.len()
    }

    pub fn specs(&self) -> Vec<LaunchSpec> {
        self.lock().launches.iter().map(|(_, spec)| spec.clone()).collect()
    }

    /// Generation of the most recent launch attempt.
    pub fn last_generation(&self) -> Option<Generation> {
        self.lock().launches.last().map(|(generation, _)| *generation)
    }

    /// Make the next `launch` fail like an OS spawn error.
    pub fn fail_next_spawn(&self) {
        self.lock().fail_next_spawn = true;
    }

    pub fn stdout(&self, generation: Generation, bytes: &[u8]) {
        self.output(generation, StreamKind::Stdout, bytes);
    }

    pub fn stderr(&self, generation: Generation, bytes: &[u8]) {
        self.output(generation, StreamKind::Stderr, bytes);
    }

    /// Report the process as gone. It stops being tracked afterwards.
    pub fn exit(&self, generation: Generation, code: Option<i32>) {
        let process = self
            .lock()
            .live
            .remove(&generation)
            .expect("exit for unknown fake process");
        process
            .inputs
            .send(SupervisorInput::Exited { generation, code })
            .expect("supervisor gone");
    }

    /// Signals delivered to `generation` since the last call.
    pub fn signals(&self, generation: Generation) -> Vec<StopSignal> {
        let mut state = self.lock();
        let Some(process) = state.live.get_mut(&generation) else {
            return Vec::new();
        };
        let mut signals = Vec::new();
        while let Ok(signal) = process.control.try_recv() {
            signals.push(signal);
        }
        signals
    }

    /// True once the supervisor dropped its handle for `generation`.
    pub fn is_released(&self, generation: Generation) -> bool {
        match self.lock().live.get(&generation) {
            Some(process) => process.control.is_closed(),
            None => true,
        }
    }

    fn output(&self, generation: Generation, stream: StreamKind, bytes: &[u8]) {
        let state = self.lock();
        let process = state
            .live
            .get(&generation)
            .expect("output for unknown fake process");
        process
            .inputs
            .send(SupervisorInput::Output {
                generation,
                stream,
                chunk: bytes.to_vec(),
            })
            .expect("supervisor gone");
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}
