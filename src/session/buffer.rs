//! Session output accumulation
//!
//! Decodes raw terminal bytes into text that patterns are matched against:
//! UTF-8 sequences split across reads are reassembled and ANSI escape
//! sequences are stripped, since the terminal program colors its own status
//! lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on retained text; older output is discarded first
pub const MAX_BUFFER_BYTES: usize = 64 * 1024;

// CSI, OSC terminated by BEL or ST, charset designation, then any other
// two-byte escape except the CSI and OSC introducers
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[()*+][0-~]|\x1b[0-Z\\^-~]",
    )
    .expect("ANSI escape regex is valid")
});

// Escape prefixes at the end of a chunk that the next chunk may still finish
static INCOMPLETE_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\x1b\][^\x07\x1b]*\x1b?|\x1b\[[0-?]*[ -/]*|\x1b[()*+]?)$")
        .expect("incomplete escape regex is valid")
});

/// Accumulated, cleaned terminal output
#[derive(Debug, Default)]
pub struct OutputBuffer {
    /// Cleaned text not yet consumed by a match
    text: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    partial_utf8: Vec<u8>,
    /// Trailing text of a possibly incomplete escape sequence
    partial_escape: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of raw output
    pub fn push(&mut self, bytes: &[u8]) {
        let mut raw = std::mem::take(&mut self.partial_utf8);
        raw.extend_from_slice(bytes);

        let decoded = match std::str::from_utf8(&raw) {
            Ok(text) => text.to_string(),
            Err(e) if e.error_len().is_none() => {
                // Incomplete sequence at the end: hold it for the next chunk
                let (valid, rest) = raw.split_at(e.valid_up_to());
                self.partial_utf8 = rest.to_vec();
                String::from_utf8_lossy(valid).into_owned()
            }
            Err(_) => String::from_utf8_lossy(&raw).into_owned(),
        };

        let mut pending = std::mem::take(&mut self.partial_escape);
        pending.push_str(&decoded);

        let keep_from = INCOMPLETE_ESCAPE
            .find(&pending)
            .map(|m| m.start())
            .filter(|&idx| pending.len() - idx < 64);
        if let Some(idx) = keep_from {
            self.partial_escape = pending.split_off(idx);
        }

        let cleaned = ANSI_ESCAPE.replace_all(&pending, "");
        self.text.push_str(&cleaned);
        self.enforce_limit();
    }

    /// Text accumulated so far
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Discard everything up to byte offset `end`
    pub fn consume(&mut self, end: usize) {
        let end = end.min(self.text.len());
        self.text.drain(..end);
    }

    fn enforce_limit(&mut self) {
        if self.text.len() <= MAX_BUFFER_BYTES {
            return;
        }
        let mut cut = self.text.len() - MAX_BUFFER_BYTES;
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }
        self.text.drain(..cut);
    }
}
