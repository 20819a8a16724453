//! Incremental decoder for the provider's line-delimited event stream
//!
//! Bytes arrive in arbitrary chunks. The decoder buffers them, splits
//! complete lines on `\n` and keeps the trailing partial line for the next
//! chunk. Lines are only turned into text once complete, so a multi-byte
//! character split across chunks is never decoded half-way.

use crate::error::{RelayError, RelayResult};
use crate::protocol::StreamChunk;
use tracing::{debug, warn};

/// Prefix marking a data frame
pub const DATA_PREFIX: &str = "data: ";

/// Payload signalling the end of the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded line of the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFrame {
    /// A data frame carrying a (possibly empty) text delta
    Delta(String),
    /// The `[DONE]` sentinel
    Done,
    /// Anything that carries no delta: blank lines, comments, other fields,
    /// and malformed payloads
    Ignored,
}

/// Parse a single complete line (terminator already removed)
pub fn parse_line(line: &[u8]) -> UpstreamFrame {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let Some(payload) = line.strip_prefix(DATA_PREFIX.as_bytes()) else {
        return UpstreamFrame::Ignored;
    };

    if payload == DONE_SENTINEL.as_bytes() {
        return UpstreamFrame::Done;
    }

    let payload = match std::str::from_utf8(payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Dropping data frame with invalid UTF-8: {}", e);
            return UpstreamFrame::Ignored;
        }
    };

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => UpstreamFrame::Delta(chunk.delta_text().to_string()),
        Err(e) => {
            warn!("Dropping malformed data frame: {}", e);
            UpstreamFrame::Ignored
        }
    }
}

/// Per-request decoding state: the unterminated tail of the byte stream and
/// whether `[DONE]` has been seen
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes after the last `\n` seen so far
    buffer: Vec<u8>,

    /// Set once the sentinel has been decoded; later input is ignored
    finished: bool,

    /// Limit on the unterminated tail
    max_frame_bytes: usize,
}

impl FrameDecoder {
    /// Create a decoder with the given limit on a single line
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            finished: false,
            max_frame_bytes,
        }
    }

    /// Whether `[DONE]` has been observed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes currently held back waiting for a line terminator
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one network chunk and return the non-empty deltas it completed,
    /// in stream order
    ///
    /// Fails only when the unterminated tail exceeds the frame limit.
    pub fn push(&mut self, chunk: &[u8]) -> RelayResult<Vec<String>> {
        let mut deltas = Vec::new();
        if self.finished {
            return Ok(deltas);
        }

        let mut rest = chunk;
        while let Some(newline) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(newline);
            rest = &tail[1..];

            let frame = if self.buffer.is_empty() {
                parse_line(head)
            } else {
                self.buffer.extend_from_slice(head);
                let line = std::mem::take(&mut self.buffer);
                parse_line(&line)
            };

            if self.apply(frame, &mut deltas) {
                self.buffer.clear();
                return Ok(deltas);
            }
        }

        self.buffer.extend_from_slice(rest);
        if self.buffer.len() > self.max_frame_bytes {
            return Err(RelayError::FrameTooLarge {
                limit: self.max_frame_bytes,
            });
        }

        Ok(deltas)
    }

    /// Flush the unterminated tail when the upstream body ends
    ///
    /// A final data frame without a trailing newline is still honoured.
    pub fn finish(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.finished {
            return deltas;
        }

        let line = std::mem::take(&mut self.buffer);
        if !line.is_empty() {
            let frame = parse_line(&line);
            self.apply(frame, &mut deltas);
        }

        if !self.finished {
            warn!("Upstream stream ended without {} sentinel", DONE_SENTINEL);
            self.finished = true;
        }

        deltas
    }

    /// Record a frame; returns true when it was the sentinel
    fn apply(&mut self, frame: UpstreamFrame, deltas: &mut Vec<String>) -> bool {
        match frame {
            UpstreamFrame::Delta(text) => {
                if !text.is_empty() {
                    deltas.push(text);
                }
                false
            }
            UpstreamFrame::Done => {
                debug!("Received {} sentinel", DONE_SENTINEL);
                self.finished = true;
                true
            }
            UpstreamFrame::Ignored => false,
        }
    }
}
