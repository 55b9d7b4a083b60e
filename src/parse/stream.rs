// src/parse/stream.rs

use crate::backend::Classifier;
use crate::events::LogEvent;
use crate::parse::{LineBuffer, strip_ansi};

/// stdout pipeline: bytes → lines → escape-free text → [`LogEvent`]s.
#[derive(Debug)]
pub struct LogStreamParser {
    lines: LineBuffer,
    classifier: Box<dyn Classifier>,
}

impl LogStreamParser {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            lines: LineBuffer::new(),
            classifier,
        }
    }

    /// Feed one chunk; returns the events for every line it completed.
    ///
    /// Never fails. A line is only classified once its terminator has
    /// arrived, so the result sequence is independent of chunking.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<LogEvent> {
        self.lines
            .push(chunk)
            .iter()
            .map(|line| self.classifier.classify(&strip_ansi(line)))
            .collect()
    }

    pub fn pending(&self) -> &str {
        self.lines.pending()
    }
}

/// stderr pipeline: every non-blank line is an error message.
#[derive(Debug, Default)]
pub struct ErrorStreamParser {
    lines: LineBuffer,
}

impl ErrorStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| {
                let line = strip_ansi(line);
                let line = line.trim_end();
                (!line.trim_start().is_empty()).then(|| line.to_string())
            })
            .collect()
    }

    pub fn pending(&self) -> &str {
        self.lines.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::XmrStakClassifier;

    #[test]
    fn escape_coded_lines_classify_like_plain_ones() {
        let mut plain = LogStreamParser::new(Box::new(XmrStakClassifier));
        let mut coloured = LogStreamParser::new(Box::new(XmrStakClassifier));

        let a = plain.push(b"Totals (ALL):    825.7  697.8    0.0 H/s\n");
        let b = coloured.push(b"\x1b[1;37mTotals (ALL):\x1b[0m    825.7  697.8    0.0 H/s\n");

        assert_eq!(a, b);
        assert_eq!(a, vec![LogEvent::hash_rate(825.7)]);
    }

    #[test]
    fn unterminated_line_is_not_classified() {
        let mut parser = LogStreamParser::new(Box::new(XmrStakClassifier));
        assert!(parser.push(b"Totals (ALL): 1").is_empty());
        assert_eq!(parser.pending(), "Totals (ALL): 1");
        assert_eq!(parser.push(b"0.5\n"), vec![LogEvent::hash_rate(10.5)]);
    }

    #[test]
    fn stderr_lines_skip_blanks_and_escapes() {
        let mut parser = ErrorStreamParser::new();
        let msgs = parser.push(b"\x1b[31mfatal: no GPU\x1b[0m  \r\n\n   \npartial");
        assert_eq!(msgs, vec!["fatal: no GPU"]);
        assert_eq!(parser.pending(), "partial");
    }
}
