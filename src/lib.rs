// src/lib.rs
// Tuck and Tale story-generation backend.

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod llm;
pub mod state;
pub mod story;
pub mod usage;
