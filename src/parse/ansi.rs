// src/parse/ansi.rs

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// CSI / escape sequences as emitted by miners that colourise their output.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x1b\x{9b}][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]")
        .unwrap_or_else(|e| panic!("invalid ANSI escape pattern: {e}"))
});

/// Remove terminal escape sequences from `line`.
///
/// Borrows when there is nothing to strip.
pub fn strip_ansi(line: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(line, "")
}
