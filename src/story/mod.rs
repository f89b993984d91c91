// src/story/mod.rs
// Story generation domain: request hydration, prompt assembly, and the
// incremental parsing pipeline.

pub mod document;
pub mod draft;
pub mod events;
pub mod pipeline;
pub mod projector;
pub mod prompt;
pub mod request;
pub mod store;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

/// Engine version tag stamped on persisted stories.
pub const ENGINE_VERSION: &str = "v3";

/// Story generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Fun,
    Growth,
}

impl GenerationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fun" => Some(GenerationMode::Fun),
            "growth" => Some(GenerationMode::Growth),
            _ => None,
        }
    }
}

/// Requested story length, resolved from the `length` catalog row name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Short,
    Medium,
    Long,
}

impl StoryLength {
    /// Catalog length names map onto the three wire values; anything
    /// unrecognised reads as medium.
    pub fn from_catalog_name(name: &str) -> Self {
        match name {
            "short" => StoryLength::Short,
            "long" => StoryLength::Long,
            _ => StoryLength::Medium,
        }
    }

    /// Paragraph-count guidance used by the prompt.
    pub fn paragraph_count(&self) -> usize {
        match self {
            StoryLength::Short => 5,
            StoryLength::Medium => 8,
            StoryLength::Long => 12,
        }
    }
}

/// Role a character plays in the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterRole {
    Hero,
    Sidekick,
    Pet,
    Friend,
    Family,
}

/// A character hydrated into the generation request.
///
/// `relationship` is derived at hydration time for second and later
/// child-typed characters; it is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterInfo {
    pub id: uuid::Uuid,
    pub name: String,
    pub character_type: String,
    pub appearance: Option<String>,
    pub age: Option<i32>,
    pub role: CharacterRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// One row of the story-parameter catalog (genre, tone, length, growth
/// topic, moral lesson).
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: uuid::Uuid,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
}

/// A fully-hydrated generation request. Constructed once per call, consumed
/// by the prompt assembler, then snapshotted into generation metadata.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    /// Non-empty; the first element is the hero.
    pub characters: Vec<CharacterInfo>,
    pub genre: CatalogEntry,
    pub tone: CatalogEntry,
    pub length: CatalogEntry,
    pub growth_topic: Option<CatalogEntry>,
    pub moral_lesson: Option<CatalogEntry>,
    pub custom_instructions: Option<String>,
}

impl GenerationRequest {
    pub fn hero(&self) -> &CharacterInfo {
        // Invariant: characters is non-empty with the hero first.
        &self.characters[0]
    }

    pub fn story_length(&self) -> StoryLength {
        StoryLength::from_catalog_name(&self.length.name)
    }
}
