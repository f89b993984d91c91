//! SSE (Server-Sent Events) stream decoding.
//!
//! The text provider frames its response as `data: <json>` lines terminated
//! by a `data: [DONE]` sentinel. Chunk boundaries from the HTTP body bear no
//! relation to line boundaries, so the decoder buffers partial lines between
//! pushes.

use anyhow::Result;
use serde::de::DeserializeOwned;

/// Buffering SSE line decoder.
///
/// Feed raw body chunks with [`push`](SseDecoder::push); complete `data:`
/// frames come back in arrival order, incomplete tails stay buffered. The
/// buffer is capped so a stream that never produces a newline cannot grow
/// memory without bound.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    /// Trailing incomplete UTF-8 sequence held back from the last chunk.
    /// Chunk boundaries can split a multi-byte character; the tail waits
    /// for its remaining bytes instead of being replaced.
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Cap on buffered, line-incomplete data (512KB).
    const MAX_BUFFER: usize = 512 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body chunk and drain any complete frames.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        if self.pending.is_empty() {
            self.decode(chunk);
        } else {
            let mut data = std::mem::take(&mut self.pending);
            data.extend_from_slice(chunk);
            self.decode(&data);
        }

        if self.buffer.len() > Self::MAX_BUFFER {
            tracing::warn!(
                buffered = self.buffer.len(),
                "SSE buffer exceeded cap, dropping oldest half"
            );
            let keep_from = self.buffer.len() / 2;
            // Stay on a char boundary after the split.
            let keep_from = (keep_from..self.buffer.len())
                .find(|&i| self.buffer.is_char_boundary(i))
                .unwrap_or(self.buffer.len());
            self.buffer.drain(..keep_from);
        }

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(frame) = frame_from_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Append bytes to the text buffer. A trailing incomplete sequence is
    /// held back for the next push; genuinely invalid bytes are replaced.
    fn decode(&mut self, mut data: &[u8]) {
        loop {
            match std::str::from_utf8(data) {
                Ok(s) => {
                    self.buffer.push_str(s);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = data.split_at(e.valid_up_to());
                    if let Ok(s) = std::str::from_utf8(valid) {
                        self.buffer.push_str(s);
                    }
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push('\u{FFFD}');
                            data = &rest[len..];
                        }
                        None => {
                            self.pending = rest.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Drain a final unterminated line at end of stream. Providers sometimes
    /// close the body without a trailing newline on the last frame.
    pub fn flush(&mut self) -> Vec<SseFrame> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let line = std::mem::take(&mut self.buffer);
        frame_from_line(&line).into_iter().collect()
    }

    /// Convenience for tests and pre-decoded text.
    pub fn push_str(&mut self, s: &str) -> Vec<SseFrame> {
        self.push(s.as_bytes())
    }

    /// True when a partial line or byte tail is still buffered.
    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty() || !self.pending.is_empty()
    }
}

fn frame_from_line(line: &str) -> Option<SseFrame> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    // event:/id:/retry: fields are not used by the provider.
    line.strip_prefix("data:").map(|data| SseFrame {
        data: data.trim_start().to_string(),
    })
}

/// One decoded `data:` line.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    /// The provider's end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }

    /// Parse the payload as JSON.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data)
            .map_err(|e| anyhow::anyhow!("SSE JSON parse error: {} (data: {})", e, self.preview()))
    }

    fn preview(&self) -> &str {
        let end = self
            .data
            .char_indices()
            .nth(120)
            .map(|(i, _)| i)
            .unwrap_or(self.data.len());
        &self.data[..end]
    }
}
