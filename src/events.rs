// src/events.rs

//! Events an adapter publishes to its host.
//!
//! The serialized shapes of [`LogEvent`] are a wire contract with existing
//! hosts and must not change:
//!
//! - `{"type":"hashRate","hashRate":825.7}`
//! - `{"type":"error","error":"..."}`
//! - `{"type":"log","message":"..."}`

use serde::Serialize;

/// Unit every reported hash rate is expressed in.
pub const HASH_RATE_UNIT: &str = "H/s";

/// One classified line of miner output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LogEvent {
    /// Total hash rate in [`HASH_RATE_UNIT`].
    #[serde(rename_all = "camelCase")]
    HashRate { hash_rate: f64 },
    Error { error: String },
    Log { message: String },
}

impl LogEvent {
    pub fn hash_rate(hash_rate: f64) -> Self {
        LogEvent::HashRate { hash_rate }
    }

    pub fn error(error: impl Into<String>) -> Self {
        LogEvent::Error {
            error: error.into(),
        }
    }

    pub fn log(message: impl Into<String>) -> Self {
        LogEvent::Log {
            message: message.into(),
        }
    }
}

/// Everything an adapter can tell its host, one variant per channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AdapterEvent {
    /// A process was spawned with these arguments.
    Start { args: Vec<String> },
    /// A classified stdout line.
    Log { log: LogEvent },
    /// Launch/spawn failures, OS errors and stderr output.
    Error { message: String },
    /// The process is gone. `code` is absent for signal deaths and for
    /// launches that never produced a process.
    Exit { code: Option<i32> },
}

impl AdapterEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            AdapterEvent::Start { .. } => "start",
            AdapterEvent::Log { .. } => "log",
            AdapterEvent::Error { .. } => "error",
            AdapterEvent::Exit { .. } => "exit",
        }
    }
}

impl From<LogEvent> for AdapterEvent {
    fn from(log: LogEvent) -> Self {
        AdapterEvent::Log { log }
    }
}
