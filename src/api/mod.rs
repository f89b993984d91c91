// src/api/mod.rs
// HTTP surface: router, handlers, auth, error responses.

pub mod auth;
pub mod error;
pub mod generate;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::router;
