//! Per-generation streaming state.

use super::document::V3Story;
use super::events::StoryStreamEvent;
use super::projector::StoryProjector;
use super::tokenizer::JsonStreamTokenizer;
use super::StoryLength;
use crate::error::GenerationError;

/// Accumulates one upstream stream: the raw buffer for the final strict
/// parse, and the tokenizer/projector pair for live events. One per active
/// generation, dropped when the SSE response closes.
#[derive(Debug, Default)]
pub struct StoryDraft {
    raw: String,
    tokenizer: JsonStreamTokenizer,
    projector: StoryProjector,
}

impl StoryDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one upstream text delta, returning the client events it
    /// completed. Chunks are buffered verbatim regardless of what the
    /// incremental scan makes of them.
    pub fn feed(&mut self, delta: &str) -> Vec<StoryStreamEvent> {
        self.raw.push_str(delta);
        self.tokenizer
            .feed(delta)
            .into_iter()
            .filter_map(|token| self.projector.apply(token))
            .collect()
    }

    /// Validate the complete buffer once upstream signals done.
    pub fn finish(self, length: StoryLength) -> Result<V3Story, GenerationError> {
        if self.raw.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        V3Story::from_raw(&self.raw, length)
    }

    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }
}
