//! Strict end-of-stream validation of the generated document.
//!
//! The incremental path is lossy on purpose; this is the authoritative
//! parse. The full raw buffer is handed to serde_json and the resulting
//! shape is checked before anything is persisted or billed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StoryLength;
use crate::error::GenerationError;

/// Top-level shape the model was asked to produce. Everything optional so
/// shape problems surface as validation errors with useful messages rather
/// than serde field errors.
#[derive(Debug, Deserialize)]
struct RawStoryDocument {
    title: Option<Value>,
    paragraphs: Option<Vec<Value>>,
    moral: Option<Value>,
}

/// One persisted paragraph. Ids are `p1`, `p2`, ... in array order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryParagraph {
    pub id: String,
    pub text: String,
}

/// The validated, persisted story content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V3Story {
    pub title: String,
    pub length: StoryLength,
    pub paragraphs: Vec<StoryParagraph>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moral: Option<String>,
}

impl V3Story {
    /// Parse and validate the complete raw buffer.
    pub fn from_raw(raw: &str, length: StoryLength) -> Result<Self, GenerationError> {
        let document: RawStoryDocument = serde_json::from_str(raw)
            .map_err(|e| GenerationError::MalformedDocument(e.to_string()))?;

        let title = match document.title {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::String(_)) => {
                return Err(GenerationError::MalformedDocument(
                    "title is empty".into(),
                ));
            }
            _ => {
                return Err(GenerationError::MalformedDocument(
                    "title is missing or not a string".into(),
                ));
            }
        };

        let raw_paragraphs = document
            .paragraphs
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                GenerationError::MalformedDocument(
                    "paragraphs is missing or empty".into(),
                )
            })?;

        let mut paragraphs = Vec::with_capacity(raw_paragraphs.len());
        for (i, value) in raw_paragraphs.into_iter().enumerate() {
            match value {
                Value::String(text) if !text.trim().is_empty() => {
                    paragraphs.push(StoryParagraph {
                        id: format!("p{}", i + 1),
                        text,
                    });
                }
                other => {
                    return Err(GenerationError::MalformedDocument(format!(
                        "paragraph {} is not a non-empty string: {}",
                        i, other
                    )));
                }
            }
        }

        // Moral is optional; null and absent both mean "no moral".
        let moral = match document.moral {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };

        Ok(V3Story {
            title,
            length,
            paragraphs,
            moral,
        })
    }

    pub fn paragraph_texts(&self) -> Vec<&str> {
        self.paragraphs.iter().map(|p| p.text.as_str()).collect()
    }
}
