// src/engine/core.rs

//! Pure supervisor state machine.
//!
//! [`SupervisorCore`] consumes [`SupervisorInput`]s one at a time and
//! produces:
//! - an updated supervisor state
//! - a list of [`SupervisorCommand`]s describing what the IO shell should do
//!
//! It has **no** channels, no Tokio types, and never touches a process, so
//! every lifecycle rule (idempotent start, restart policy, stop races) can be
//! unit tested by feeding inputs and inspecting commands.

use std::sync::Arc;

use crate::backend::{Classifier, LaunchBuilder};
use crate::engine::event_handlers::{
    CoreStep, handle_exit, handle_io_error, handle_output, handle_shutdown, handle_spawn_failed,
    handle_spawned, handle_start, handle_stop,
};
use crate::engine::{Generation, StartRequest, SupervisorInput};
use crate::fs::FileSystem;
use crate::parse::{ErrorStreamParser, LogStreamParser};
use crate::types::StopSignal;

/// Where the supervised process is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessState {
    /// No live process.
    Idle,
    /// A spawn was requested but not yet confirmed.
    Launching {
        generation: Generation,
        args: Vec<String>,
        /// A `stop` that arrived before the spawn was confirmed.
        pending_signal: Option<StopSignal>,
    },
    /// The process is alive.
    Running {
        generation: Generation,
        pid: Option<u32>,
    },
}

impl ProcessState {
    /// True while the adapter owns (or is about to own) a process.
    pub fn has_process(&self) -> bool {
        !matches!(self, ProcessState::Idle)
    }

    pub fn generation(&self) -> Option<Generation> {
        match self {
            ProcessState::Idle => None,
            ProcessState::Launching { generation, .. } | ProcessState::Running { generation, .. } => {
                Some(*generation)
            }
        }
    }
}

/// Mutable supervisor bookkeeping shared by the event handlers.
#[derive(Debug)]
pub struct SupervisorState {
    pub intended_running: bool,
    pub process: ProcessState,
    pub last_request: Option<StartRequest>,
    pub next_generation: Generation,
    pub restarts: u64,
    pub shut_down: bool,
    pub stdout: LogStreamParser,
    pub stderr: ErrorStreamParser,
}

impl SupervisorState {
    pub(crate) fn allocate_generation(&mut self) -> Generation {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}

/// Pure core of one adapter.
#[derive(Debug)]
pub struct SupervisorCore {
    builder: Box<dyn LaunchBuilder>,
    fs: Arc<dyn FileSystem>,
    state: SupervisorState,
}

impl SupervisorCore {
    pub fn new(
        builder: Box<dyn LaunchBuilder>,
        classifier: Box<dyn Classifier>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            builder,
            fs,
            state: SupervisorState {
                intended_running: false,
                process: ProcessState::Idle,
                last_request: None,
                next_generation: 0,
                restarts: 0,
                shut_down: false,
                stdout: LogStreamParser::new(classifier),
                stderr: ErrorStreamParser::new(),
            },
        }
    }

    pub fn intended_running(&self) -> bool {
        self.state.intended_running
    }

    pub fn process(&self) -> &ProcessState {
        &self.state.process
    }

    /// Number of automatic restarts performed so far.
    pub fn restarts(&self) -> u64 {
        self.state.restarts
    }

    /// Handle a single input, updating state and returning the resulting
    /// commands for the IO shell.
    pub fn step(&mut self, input: SupervisorInput) -> CoreStep {
        let state = &mut self.state;
        match input {
            SupervisorInput::Start(request) => {
                handle_start(state, self.builder.as_ref(), self.fs.as_ref(), request)
            }
            SupervisorInput::Stop(signal) => handle_stop(state, signal),
            SupervisorInput::Spawned { generation, pid } => handle_spawned(state, generation, pid),
            SupervisorInput::SpawnFailed { generation, error } => {
                handle_spawn_failed(state, generation, error)
            }
            SupervisorInput::Output {
                generation,
                stream,
                chunk,
            } => handle_output(state, generation, stream, &chunk),
            SupervisorInput::IoError { generation, error } => {
                handle_io_error(state, generation, error)
            }
            SupervisorInput::Exited { generation, code } => {
                handle_exit(state, self.builder.as_ref(), self.fs.as_ref(), generation, code)
            }
            SupervisorInput::Shutdown => handle_shutdown(state),
        }
    }
}
