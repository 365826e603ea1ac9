//! Line framing over a byte stream
//!
//! Reads never line up with protocol lines, so the framer keeps the trailing
//! fragment of each read and prefixes it to the next one.

/// Splits a byte stream into LF-terminated lines
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes and return every line it completes.
    ///
    /// The terminating `\n` and a single trailing `\r` are stripped. Invalid
    /// UTF-8 is replaced rather than rejected. Empty lines are returned as
    /// empty strings; callers decide whether to ignore them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            if self.partial.last() == Some(&b'\r') {
                self.partial.pop();
            }
            lines.push(String::from_utf8_lossy(&self.partial).into_owned());
            self.partial.clear();
        }

        self.partial.extend_from_slice(rest);
        lines
    }

    /// Bytes received since the last complete line
    pub fn pending(&self) -> &[u8] {
        &self.partial
    }
}
