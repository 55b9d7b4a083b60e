// src/engine/event_handlers.rs

//! Transition logic for the supervisor core.

use tracing::{debug, info, trace, warn};

use crate::backend::{LaunchBuilder, LaunchSpec};
use crate::engine::core::{ProcessState, SupervisorState};
use crate::engine::{ExitKind, Generation, StartRequest};
use crate::events::AdapterEvent;
use crate::fs::FileSystem;
use crate::types::{StopSignal, StreamKind};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorCommand {
    /// Create the process; report back with `Spawned` or `SpawnFailed`.
    Spawn {
        generation: Generation,
        spec: LaunchSpec,
    },
    /// Deliver a signal to the live process.
    Signal {
        generation: Generation,
        signal: StopSignal,
    },
    /// Forget the handle of a process that has exited.
    Release { generation: Generation },
    /// Publish an event to the host.
    Emit(AdapterEvent),
}

/// Decision returned by the core after handling a single input.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<SupervisorCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<SupervisorCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn nothing() -> Self {
        Self::continue_with(Vec::new())
    }
}

/// Host called `start`.
///
/// At most one process per adapter: if one is launching or running this is a
/// no-op. Otherwise the intent flips to running and a launch is attempted.
pub fn handle_start(
    state: &mut SupervisorState,
    builder: &dyn LaunchBuilder,
    fs: &dyn FileSystem,
    request: StartRequest,
) -> CoreStep {
    if state.process.has_process() {
        debug!(
            generation = state.process.generation(),
            "start requested while a process is owned; ignoring"
        );
        return CoreStep::nothing();
    }

    state.intended_running = true;
    state.last_request = Some(request);
    CoreStep::continue_with(launch(state, builder, fs))
}

/// Host called `stop`.
pub fn handle_stop(state: &mut SupervisorState, signal: StopSignal) -> CoreStep {
    state.intended_running = false;

    match &mut state.process {
        ProcessState::Idle => {
            debug!("stop requested with no live process");
            CoreStep::nothing()
        }
        ProcessState::Launching {
            generation,
            pending_signal,
            ..
        } => {
            debug!(generation = *generation, ?signal, "stop requested during launch; deferring signal");
            *pending_signal = Some(signal);
            CoreStep::nothing()
        }
        ProcessState::Running { generation, .. } => {
            info!(generation = *generation, ?signal, "stopping miner process");
            CoreStep::continue_with(vec![SupervisorCommand::Signal {
                generation: *generation,
                signal,
            }])
        }
    }
}

/// The launcher confirmed the spawn.
pub fn handle_spawned(
    state: &mut SupervisorState,
    generation: Generation,
    pid: Option<u32>,
) -> CoreStep {
    let ProcessState::Launching {
        generation: launching,
        args,
        pending_signal,
    } = &mut state.process
    else {
        warn!(generation, "spawn confirmation without a pending launch; ignoring");
        return CoreStep::nothing();
    };
    if *launching != generation {
        warn!(generation, expected = *launching, "stale spawn confirmation; ignoring");
        return CoreStep::nothing();
    }

    let args = std::mem::take(args);
    let pending_signal = pending_signal.take();
    state.process = ProcessState::Running { generation, pid };
    info!(generation, pid, "miner process started");

    let mut commands = vec![SupervisorCommand::Emit(AdapterEvent::Start { args })];
    if let Some(signal) = pending_signal {
        commands.push(SupervisorCommand::Signal { generation, signal });
    }
    CoreStep::continue_with(commands)
}

/// The OS could not create the process.
///
/// Reported like a launch failure. No automatic retry: the process never
/// existed, so there was no exit to react to.
pub fn handle_spawn_failed(
    state: &mut SupervisorState,
    generation: Generation,
    error: String,
) -> CoreStep {
    if state.process.generation() != Some(generation) {
        return CoreStep::nothing();
    }

    warn!(generation, error = %error, "failed to spawn miner process");
    state.process = ProcessState::Idle;
    CoreStep::continue_with(vec![
        SupervisorCommand::Emit(AdapterEvent::Error { message: error }),
        SupervisorCommand::Emit(AdapterEvent::Exit { code: None }),
    ])
}

/// A chunk of output arrived.
///
/// Output is parsed even when it belongs to an earlier generation: it is
/// still real output, and the line buffers carry over between processes.
pub fn handle_output(
    state: &mut SupervisorState,
    generation: Generation,
    stream: StreamKind,
    chunk: &[u8],
) -> CoreStep {
    let commands = match stream {
        StreamKind::Stdout => state
            .stdout
            .push(chunk)
            .into_iter()
            .map(|log| SupervisorCommand::Emit(AdapterEvent::Log { log }))
            .collect(),
        StreamKind::Stderr => state
            .stderr
            .push(chunk)
            .into_iter()
            .map(|message| SupervisorCommand::Emit(AdapterEvent::Error { message }))
            .collect(),
    };
    trace!(generation, %stream, bytes = chunk.len(), "output chunk");
    CoreStep::continue_with(commands)
}

pub fn handle_io_error(
    _state: &mut SupervisorState,
    generation: Generation,
    error: String,
) -> CoreStep {
    warn!(generation, error = %error, "miner process IO error");
    CoreStep::continue_with(vec![SupervisorCommand::Emit(AdapterEvent::Error {
        message: error,
    })])
}

/// The process exited.
///
/// Any exit while the host still wants the miner running is a crash and
/// triggers an immediate relaunch with the last start parameters, with no
/// backoff and no retry limit. This includes exit code 0.
pub fn handle_exit(
    state: &mut SupervisorState,
    builder: &dyn LaunchBuilder,
    fs: &dyn FileSystem,
    generation: Generation,
    code: Option<i32>,
) -> CoreStep {
    if state.process.generation() != Some(generation) {
        debug!(generation, "exit of a process we no longer own; ignoring");
        return CoreStep::nothing();
    }
    state.process = ProcessState::Idle;

    let kind = if state.intended_running && !state.shut_down {
        ExitKind::Crash
    } else {
        ExitKind::Clean
    };

    let mut commands = vec![
        SupervisorCommand::Release { generation },
        SupervisorCommand::Emit(AdapterEvent::Exit { code }),
    ];

    match kind {
        ExitKind::Clean => {
            info!(generation, exit_code = code, "miner process stopped");
        }
        ExitKind::Crash => {
            state.restarts += 1;
            warn!(
                generation,
                exit_code = code,
                restarts = state.restarts,
                "miner process exited unexpectedly; restarting"
            );
            commands.extend(launch(state, builder, fs));
        }
    }

    CoreStep::continue_with(commands)
}

/// Host is going away.
pub fn handle_shutdown(state: &mut SupervisorState) -> CoreStep {
    state.intended_running = false;
    state.shut_down = true;

    let mut commands = Vec::new();
    if let Some(generation) = state.process.generation() {
        info!(generation, "shutting down; killing miner process");
        commands.push(SupervisorCommand::Signal {
            generation,
            signal: StopSignal::Kill,
        });
    }

    CoreStep {
        commands,
        keep_running: false,
    }
}

/// Resolve the last start request and request a spawn.
///
/// On a launch error nothing is spawned and the host sees `error` followed
/// by a code-less `exit`.
fn launch(
    state: &mut SupervisorState,
    builder: &dyn LaunchBuilder,
    fs: &dyn FileSystem,
) -> Vec<SupervisorCommand> {
    let Some(request) = &state.last_request else {
        return Vec::new();
    };

    match builder.build(&request.workload, &request.env, fs) {
        Ok(spec) => {
            let generation = state.allocate_generation();
            debug!(
                generation,
                program = ?spec.program,
                args = ?spec.args,
                "launching miner process"
            );
            state.process = ProcessState::Launching {
                generation,
                args: spec.args.clone(),
                pending_signal: None,
            };
            vec![SupervisorCommand::Spawn { generation, spec }]
        }
        Err(err) => {
            warn!(error = %err, "cannot launch miner");
            vec![
                SupervisorCommand::Emit(AdapterEvent::Error {
                    message: err.to_string(),
                }),
                SupervisorCommand::Emit(AdapterEvent::Exit { code: None }),
            ]
        }
    }
}
