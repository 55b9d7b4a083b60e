// src/exec/owned_pid.rs

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
#[cfg(unix)]
use tracing::warn;

/// PID of the child an adapter currently owns, readable outside the
/// adapter's task.
///
/// The launcher sets it on spawn and clears it as soon as the child has
/// been reaped, so a PID the OS may already have recycled is never held.
/// [`OwnedPid::kill_now`] is the synchronous last resort used when the host
/// shuts down and cannot wait for the asynchronous stop path.
#[derive(Debug, Clone, Default)]
pub struct OwnedPid(Arc<Mutex<Option<u32>>>);

impl OwnedPid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pid: Option<u32>) {
        *self.lock() = pid;
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Clear the cell only if it still holds `pid`.
    pub fn clear_if(&self, pid: u32) {
        let mut owned = self.lock();
        if *owned == Some(pid) {
            *owned = None;
        }
    }

    pub fn get(&self) -> Option<u32> {
        *self.lock()
    }

    /// Forcibly kill the owned child, if any. Best effort.
    #[cfg(unix)]
    pub fn kill_now(&self) -> bool {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.lock().take() else {
            return false;
        };
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };

        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => {
                debug!(pid, "killed owned miner process");
                true
            }
            Err(errno) => {
                warn!(pid, error = %errno, "failed to kill owned miner process");
                false
            }
        }
    }

    /// Forcibly kill the owned child, if any. Best effort.
    ///
    /// Without unix signals the kill is left to the process task, which
    /// terminates the child once its handle is dropped.
    #[cfg(not(unix))]
    pub fn kill_now(&self) -> bool {
        let pid = self.lock().take();
        debug!(?pid, "synchronous kill unavailable; relying on handle drop");
        false
    }

    fn lock(&self) -> MutexGuard<'_, Option<u32>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
