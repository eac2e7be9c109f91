//! Line scanning for SSE response bodies.
//!
//! HTTP chunks split anywhere, including mid-line and mid-codepoint, so the
//! scanner buffers bytes and only yields complete lines.

pub(crate) struct SseLineScanner {
    buffer: Vec<u8>,
}

impl SseLineScanner {
    pub(crate) fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Feed raw bytes; returns the complete lines they closed, without
    /// trailing newline characters.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }
}

/// Payload of a `data:` SSE line, with the optional leading space removed.
pub(crate) fn sse_data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}
