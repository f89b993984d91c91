// src/error.rs
// Generation pipeline error taxonomy

use std::fmt;

/// Machine-readable reason codes for usage-gate rejections.
///
/// The client keys its upsell messaging off these, so the wire strings are
/// part of the API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageReason {
    SubscriptionLimitReached,
    PaywallRequired,
}

impl UsageReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageReason::SubscriptionLimitReached => "subscription_limit_reached",
            UsageReason::PaywallRequired => "paywall_required",
        }
    }
}

impl fmt::Display for UsageReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can terminate a generation attempt.
///
/// Every variant except `Disconnected` is converted into exactly one SSE
/// `error` event; none escape the HTTP boundary as a panic or an unhandled
/// error. `Disconnected` means the client went away and nothing more should
/// be emitted or persisted.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Generation not allowed: {reason}")]
    UsageLimit { reason: UsageReason },

    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    #[error("Story parameter not found: {kind} {id}")]
    MissingParameter { kind: &'static str, id: String },

    #[error("Text provider error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("The story service returned an empty response")]
    EmptyResponse,

    #[error("The generated story was malformed: {0}")]
    MalformedDocument(String),

    #[error("Failed to save story: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Client disconnected")]
    Disconnected,
}

impl GenerationError {
    /// Message carried by the SSE `error` event.
    ///
    /// Internal detail (SQL errors, provider bodies) is logged server-side;
    /// the client gets a stable, human-readable line.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Persistence(_) => {
                "Failed to save your story. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
