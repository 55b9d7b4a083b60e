// src/engine/mod.rs

//! Process supervision engine.
//!
//! This module ties together:
//! - the launch builder (what to run)
//! - the output parsers (what the process says)
//! - the restart policy (what to do when it dies)
//!
//! The pure core state machine lives in [`core`] with its transition logic
//! in [`event_handlers`]; the async/IO shell driving a real
//! [`ProcessLauncher`](crate::exec::ProcessLauncher) is implemented in
//! [`runtime`].

use crate::backend::EnvMap;
use crate::config::WorkloadConfig;
use crate::types::{StopSignal, StreamKind};

/// Identifies one spawned process within an adapter's lifetime.
///
/// Incremented on every spawn attempt so late inputs from a previous
/// process can be told apart from the current one.
pub type Generation = u64;

/// Parameters of the most recent `start`, reused for automatic restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub workload: WorkloadConfig,
    pub env: EnvMap,
}

/// How a process ended, from the supervisor's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Exit after an explicit `stop` (or shutdown).
    Clean,
    /// Any exit while the host still wanted the process running,
    /// including exit code 0.
    Crash,
}

/// Events flowing into the supervisor from the host and from the process.
#[derive(Debug, Clone)]
pub enum SupervisorInput {
    /// Host wants the workload running.
    Start(StartRequest),
    /// Host wants the workload stopped.
    Stop(StopSignal),
    /// The launcher created the process.
    Spawned {
        generation: Generation,
        pid: Option<u32>,
    },
    /// The OS refused to create the process.
    SpawnFailed {
        generation: Generation,
        error: String,
    },
    /// Raw bytes read from one of the child's pipes.
    Output {
        generation: Generation,
        stream: StreamKind,
        chunk: Vec<u8>,
    },
    /// Reading a pipe or waiting on the child failed.
    IoError {
        generation: Generation,
        error: String,
    },
    /// The process is gone.
    Exited {
        generation: Generation,
        code: Option<i32>,
    },
    /// Host is shutting down; kill whatever is left and stop the loop.
    Shutdown,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::{ProcessState, SupervisorCore};
pub use event_handlers::{CoreStep, SupervisorCommand};
pub use runtime::SupervisorRuntime;
