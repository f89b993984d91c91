// src/core/mod.rs
// Shared protocol primitives

mod streaming;

pub use streaming::{SseDecoder, SseFrame};
