// src/exec/process_runner.rs

//! Production launcher built on `tokio::process`.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::backend::LaunchSpec;
use crate::engine::{Generation, SupervisorInput};
use crate::exec::OwnedPid;
use crate::exec::launcher::{ProcessHandle, ProcessLauncher};
use crate::types::{StopSignal, StreamKind};

const READ_CHUNK_SIZE: usize = 8192;

/// Default time allowed for the pipes to drain after the child exits.
pub const DEFAULT_OUTPUT_DRAIN: Duration = Duration::from_millis(500);

/// Spawns real processes.
///
/// Each process gets three background tasks: one reader per pipe, forwarding
/// raw chunks in arrival order, and a waiter that owns the `Child`, applies
/// stop signals and reports the exit once both readers have finished (or the
/// drain timeout passed, e.g. because a grandchild still holds a pipe open).
#[derive(Debug, Clone)]
pub struct TokioLauncher {
    output_drain: Duration,
}

impl TokioLauncher {
    pub fn new(output_drain: Duration) -> Self {
        Self { output_drain }
    }
}

impl Default for TokioLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DRAIN)
    }
}

impl ProcessLauncher for TokioLauncher {
    fn launch(
        &mut self,
        generation: Generation,
        spec: &LaunchSpec,
        inputs: mpsc::UnboundedSender<SupervisorInput>,
        owned_pid: &OwnedPid,
    ) -> io::Result<ProcessHandle> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(spec.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child.id();
        owned_pid.set(pid);
        info!(generation, pid, program = ?spec.program, "spawned miner process");

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(generation, StreamKind::Stdout, stdout, inputs.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(generation, StreamKind::Stderr, stderr, inputs.clone()));
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        tokio::spawn(supervise_child(
            generation,
            child,
            control_rx,
            readers,
            inputs,
            ReapGuard {
                owned_pid: owned_pid.clone(),
                pid,
            },
            self.output_drain,
        ));

        Ok(ProcessHandle::new(pid, control_tx))
    }
}

fn spawn_reader<R>(
    generation: Generation,
    stream: StreamKind,
    mut pipe: R,
    inputs: mpsc::UnboundedSender<SupervisorInput>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let input = SupervisorInput::Output {
                        generation,
                        stream,
                        chunk: buf[..n].to_vec(),
                    };
                    if inputs.send(input).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = inputs.send(SupervisorInput::IoError {
                        generation,
                        error: format!("reading {stream}: {e}"),
                    });
                    break;
                }
            }
        }
        debug!(generation, %stream, "output reader finished");
    })
}

async fn supervise_child(
    generation: Generation,
    mut child: Child,
    mut control: mpsc::UnboundedReceiver<StopSignal>,
    readers: Vec<JoinHandle<()>>,
    inputs: mpsc::UnboundedSender<SupervisorInput>,
    reaped: ReapGuard,
    output_drain: Duration,
) {
    // Either the process exits on its own, or the supervisor asks us to
    // signal it (and we keep waiting), or the handle is dropped (kill).
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            signal = control.recv() => match signal {
                Some(signal) => {
                    if let Err(e) = deliver_signal(&mut child, signal) {
                        warn!(generation, ?signal, error = %e, "failed to signal miner process");
                    }
                }
                None => {
                    debug!(generation, "process handle dropped; killing miner process");
                    if let Err(e) = child.start_kill() {
                        debug!(generation, error = %e, "kill after handle drop failed");
                    }
                    break child.wait().await;
                }
            },
        }
    };

    // The PID is free for reuse from here on, drain or not.
    reaped.release();

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            let _ = inputs.send(SupervisorInput::IoError {
                generation,
                error: format!("waiting for miner process: {e}"),
            });
            None
        }
    };

    let deadline = Instant::now() + output_drain;
    for mut reader in readers {
        if timeout_at(deadline, &mut reader).await.is_err() {
            warn!(generation, "miner output still open after exit; dropping the rest");
            reader.abort();
        }
    }

    debug!(generation, exit_code = code, "miner process exited");
    let _ = inputs.send(SupervisorInput::Exited { generation, code });
}

/// Clears the owned PID once the child is reaped.
struct ReapGuard {
    owned_pid: OwnedPid,
    pid: Option<u32>,
}

impl ReapGuard {
    fn release(self) {
        if let Some(pid) = self.pid {
            self.owned_pid.clear_if(pid);
        }
    }
}

#[cfg(unix)]
fn deliver_signal(child: &mut Child, signal: StopSignal) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;
    let signal: Signal = signal.into();
    kill(Pid::from_raw(pid), signal)?;
    Ok(())
}

#[cfg(not(unix))]
fn deliver_signal(child: &mut Child, _signal: StopSignal) -> io::Result<()> {
    child.start_kill()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::backend::EnvMap;

    fn shell(script: &str) -> LaunchSpec {
        LaunchSpec {
            program: "/bin/sh".into(),
            args: vec!["-c".into(), script.into()],
            env: EnvMap::from_current(),
        }
    }

    async fn next_exit(rx: &mut mpsc::UnboundedReceiver<SupervisorInput>) -> Option<i32> {
        loop {
            match rx.recv().await {
                Some(SupervisorInput::Exited { code, .. }) => return code,
                Some(_) => {}
                None => panic!("launcher dropped its senders without reporting an exit"),
            }
        }
    }

    #[tokio::test]
    async fn owned_pid_is_cleared_before_output_drains() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let owned = OwnedPid::new();
        let mut launcher = TokioLauncher::new(Duration::from_secs(2));

        // The background sleep inherits stdout and holds it open after the
        // shell itself has exited and been reaped.
        let handle = launcher
            .launch(0, &shell("sleep 3 & exit 1"), tx, &owned)
            .unwrap();
        assert!(handle.pid().is_some());

        tokio::time::timeout(Duration::from_secs(1), async {
            while owned.get().is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("owned pid still set after the child was reaped");

        while let Ok(input) = rx.try_recv() {
            assert!(
                !matches!(input, SupervisorInput::Exited { .. }),
                "exit reported before the drain timeout"
            );
        }

        let code = tokio::time::timeout(Duration::from_secs(5), next_exit(&mut rx))
            .await
            .unwrap();
        assert_eq!(code, Some(1));
        drop(handle);
    }

    #[tokio::test]
    async fn owned_pid_tracks_a_running_child() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let owned = OwnedPid::new();
        let mut launcher = TokioLauncher::default();

        let handle = launcher
            .launch(0, &shell("exec sleep 30"), tx, &owned)
            .unwrap();
        assert_eq!(owned.get(), handle.pid());

        assert!(handle.signal(StopSignal::Kill));
        let code = tokio::time::timeout(Duration::from_secs(5), next_exit(&mut rx))
            .await
            .unwrap();
        assert_eq!(code, None);
        assert_eq!(owned.get(), None);
    }
}
