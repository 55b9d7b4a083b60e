// src/exec/launcher.rs

//! Pluggable process launcher abstraction.
//!
//! The supervisor shell talks to a `ProcessLauncher` instead of
//! `tokio::process` directly. Production code uses
//! [`TokioLauncher`](super::TokioLauncher); tests provide their own
//! implementation that records launch specs and lets the test inject output
//! and exits by hand.

use std::io;

use tokio::sync::mpsc;

use crate::backend::LaunchSpec;
use crate::engine::{Generation, SupervisorInput};
use crate::exec::OwnedPid;
use crate::types::StopSignal;

/// Trait abstracting how a miner process is created.
pub trait ProcessLauncher: Send + 'static {
    /// Create the process described by `spec`.
    ///
    /// Must return without waiting for the process. Everything observed
    /// afterwards (output chunks, IO errors, the final exit) is reported on
    /// `inputs`, tagged with `generation`, and exactly one
    /// `SupervisorInput::Exited` must eventually be sent for every `Ok`.
    ///
    /// Launchers that create OS processes record the PID in `owned_pid` and
    /// clear it the moment the child is reaped, before reporting `Exited`.
    fn launch(
        &mut self,
        generation: Generation,
        spec: &LaunchSpec,
        inputs: mpsc::UnboundedSender<SupervisorInput>,
        owned_pid: &OwnedPid,
    ) -> io::Result<ProcessHandle>;
}

/// The supervisor's grip on a live process.
///
/// Dropping the handle asks the launcher to kill the process.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    control: mpsc::UnboundedSender<StopSignal>,
}

impl ProcessHandle {
    pub fn new(pid: Option<u32>, control: mpsc::UnboundedSender<StopSignal>) -> Self {
        Self { pid, control }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask for `signal` to be delivered. Returns `false` if the process is
    /// already gone.
    pub fn signal(&self, signal: StopSignal) -> bool {
        self.control.send(signal).is_ok()
    }
}
