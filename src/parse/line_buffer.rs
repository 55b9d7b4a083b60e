// src/parse/line_buffer.rs

/// Longest line handed out, in bytes. Longer lines are cut into pieces.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Reassembles newline-terminated lines from a fragmented byte stream.
///
/// Lines end at `\n`, with one directly preceding `\r` removed. Whatever
/// follows the last terminator stays buffered until more bytes arrive.
/// Multi-byte UTF-8 sequences split across chunks are held back until they
/// are complete, so the decoded text never depends on where the stream was
/// cut; invalid bytes decode to U+FFFD.
///
/// A line longer than the limit ([`MAX_LINE_LEN`] by default) is handed out
/// in limit-sized pieces as soon as they are known, so a child that never
/// writes a newline cannot grow the buffer without bound. The pieces are
/// the same however the stream was chunked.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    text: String,
    undecoded: Vec<u8>,
    max_line_len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max_line_len` is clamped to at least 4 bytes, so every piece holds
    /// at least one character.
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            text: String::new(),
            undecoded: Vec::new(),
            max_line_len: max_line_len.max(4),
        }
    }

    /// Append `chunk` and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let mut lines = Vec::new();
        if let Some(last_newline) = self.text.rfind('\n') {
            let rest = self.text.split_off(last_newline + 1);
            let complete = std::mem::replace(&mut self.text, rest);

            for line in complete.split_terminator('\n') {
                let mut line = line.strip_suffix('\r').unwrap_or(line);
                while line.len() > self.max_line_len {
                    let (piece, rest) = line.split_at(self.cut_point(line));
                    lines.push(piece.to_string());
                    line = rest;
                }
                lines.push(line.to_string());
            }
        }

        // A trailing `\r` may still be stripped by the next chunk, so it does
        // not count towards the pending line's length.
        while self.text.strip_suffix('\r').unwrap_or(&self.text).len() > self.max_line_len {
            let cut = self.cut_point(&self.text);
            let rest = self.text.split_off(cut);
            lines.push(std::mem::replace(&mut self.text, rest));
        }

        lines
    }

    /// The unterminated tail received so far.
    pub fn pending(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.undecoded.is_empty()
    }

    /// Largest char boundary within the limit.
    fn cut_point(&self, line: &str) -> usize {
        let mut cut = self.max_line_len.min(line.len());
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        cut
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.undecoded.extend_from_slice(chunk);

        let bytes = std::mem::take(&mut self.undecoded);
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    self.text.push_str(s);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // Truncated sequence; wait for the next chunk.
                            self.undecoded = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_trailing_fragment_until_terminated() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"hello wo").is_empty());
        assert_eq!(buf.pending(), "hello wo");

        assert_eq!(buf.push(b"rld\nnext"), vec!["hello world"]);
        assert_eq!(buf.pending(), "next");
    }

    #[test]
    fn splits_on_crlf_and_lf() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\r\nb\nc\r\n"), vec!["a", "b", "c"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn carriage_return_split_from_its_newline() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"line\r").is_empty());
        assert_eq!(buf.push(b"\n"), vec!["line"]);
    }

    #[test]
    fn lone_carriage_return_is_kept() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\rb\n"), vec!["a\rb"]);
    }

    #[test]
    fn empty_lines_are_lines() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"\n\nx\n"), vec!["", "", "x"]);
    }

    #[test]
    fn utf8_sequence_split_across_chunks() {
        let bytes = "hashrate 5 kH/s \u{2192} ok\n".as_bytes();
        let arrow = bytes.iter().position(|b| *b == 0xE2).unwrap();

        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..arrow + 1]).is_empty());
        assert!(buf.push(&bytes[arrow + 1..arrow + 2]).is_empty());
        assert_eq!(buf.push(&bytes[arrow + 2..]), vec!["hashrate 5 kH/s \u{2192} ok"]);
    }

    #[test]
    fn unterminated_output_is_cut_at_the_limit() {
        let mut buf = LineBuffer::with_max_line_len(8);
        assert!(buf.push(b"abcdefgh").is_empty());
        assert_eq!(buf.push(b"ijklmnopq"), vec!["abcdefgh", "ijklmnop"]);
        assert_eq!(buf.pending(), "q");
        assert_eq!(buf.push(b"\n"), vec!["q"]);
    }

    #[test]
    fn long_lines_cut_the_same_way_regardless_of_chunking() {
        let stream = "0123456789abc\r\n01234567\r\nxy\u{e9}\u{e9}\u{e9}\u{e9}z\n".as_bytes();

        let mut whole = LineBuffer::with_max_line_len(8);
        let expected = whole.push(stream);
        assert_eq!(
            expected,
            vec!["01234567", "89abc", "01234567", "xy\u{e9}\u{e9}\u{e9}", "\u{e9}z"]
        );

        for size in 1..stream.len() {
            let mut buf = LineBuffer::with_max_line_len(8);
            let lines: Vec<String> = stream.chunks(size).flat_map(|c| buf.push(c)).collect();
            assert_eq!(lines, expected, "chunk size {size}");
        }
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"bad \xff byte\n"), vec!["bad \u{FFFD} byte"]);
    }
}
