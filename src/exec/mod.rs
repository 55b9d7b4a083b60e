// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the miner, using
//! `tokio::process::Command`, and reporting back to the supervisor via
//! [`SupervisorInput`](crate::engine::SupervisorInput)s.
//!
//! - [`launcher`] provides the `ProcessLauncher` trait the supervisor shell
//!   talks to, plus the handle it keeps for a live process. Tests can swap
//!   in a fake launcher that never spawns anything.
//! - [`process_runner`] is the production launcher: it spawns the child,
//!   streams both pipes as raw chunks and reports the exit.
//! - [`owned_pid`] lets the host kill a child synchronously on shutdown.

pub mod launcher;
pub mod owned_pid;
pub mod process_runner;

pub use launcher::{ProcessHandle, ProcessLauncher};
pub use owned_pid::OwnedPid;
pub use process_runner::TokioLauncher;
