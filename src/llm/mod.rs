// src/llm/mod.rs
// Upstream text-provider client

mod openai;

pub use openai::OpenAiClient;

/// Events produced by the upstream chat-completion stream.
///
/// The reader task tears the provider's SSE framing down to the only three
/// things the pipeline cares about: text deltas, clean end-of-stream, and
/// transport failure.
#[derive(Debug, Clone)]
pub enum UpstreamEvent {
    /// Incremental content fragment from `choices[0].delta.content`.
    Delta(String),
    /// The provider signalled completion (`[DONE]` or stream end).
    Done,
    /// The stream broke mid-flight.
    Error(String),
}
