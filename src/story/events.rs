//! Events sent to the client over the story SSE channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One SSE `data:` payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoryStreamEvent {
    /// Generation accepted; upstream request is in flight.
    Started,
    /// The story title, sent once.
    Title { text: String },
    /// One paragraph, indexed in arrival order from zero.
    Paragraph { index: u32, text: String },
    /// The moral of the story, sent once.
    Moral { text: String },
    /// The story was validated and saved; terminal on success.
    Complete {
        #[serde(rename = "storyId")]
        story_id: Uuid,
    },
    /// Something went wrong; terminal. At most one per stream.
    Error { message: String },
}
