// src/parse/mod.rs

//! Turning raw miner output into events.
//!
//! - [`line_buffer`] reassembles lines from arbitrarily fragmented chunks.
//! - [`ansi`] removes terminal colour / cursor sequences.
//! - [`stream`] combines both with a backend [`Classifier`] into the
//!   per-pipe parsers the supervisor feeds.
//!
//! [`Classifier`]: crate::backend::Classifier

pub mod ansi;
pub mod line_buffer;
pub mod stream;

use std::sync::LazyLock;

use regex::Regex;

pub use ansi::strip_ansi;
pub use line_buffer::LineBuffer;
pub use stream::{ErrorStreamParser, LogStreamParser};

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .unwrap_or_else(|e| panic!("invalid float prefix pattern: {e}"))
});

/// Parse the longest numeric prefix of `s`, or 0 when there is none.
///
/// Miners print rates like `825.7`, `n/a` or `12.5H/s`; the first gives
/// 825.7, the second 0, the third 12.5.
pub fn leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    FLOAT_PREFIX
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
