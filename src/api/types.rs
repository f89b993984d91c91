// src/api/types.rs
// Request/response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::story::request::HydrationInput;
use crate::story::GenerationMode;

/// Body of `POST /api/stories/generate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryBody {
    pub hero_id: String,
    pub mode: String,
    pub genre_id: String,
    pub tone_id: String,
    pub length_id: String,
    #[serde(default)]
    pub character_ids: Vec<String>,
    pub growth_topic_id: Option<String>,
    pub moral_lesson_id: Option<String>,
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub include_illustrations: bool,
    #[serde(default)]
    pub use_credit: bool,
}

/// A body that passed field validation, ready for hydration.
#[derive(Debug, Clone)]
pub struct ValidatedGeneration {
    pub input: HydrationInput,
    pub include_illustrations: bool,
    pub use_credit: bool,
}

impl GenerateStoryBody {
    /// Field-level validation, run before the SSE stream opens so failures
    /// can still be plain HTTP 400s.
    pub fn validate(self) -> Result<ValidatedGeneration, String> {
        let mode = GenerationMode::parse(&self.mode)
            .ok_or_else(|| format!("unknown mode: {:?}", self.mode))?;

        let growth_topic_id = self
            .growth_topic_id
            .as_deref()
            .map(|id| parse_id("growthTopicId", id))
            .transpose()?;
        if mode == GenerationMode::Growth && growth_topic_id.is_none() {
            return Err("growth mode requires growthTopicId".to_string());
        }

        let character_ids = self
            .character_ids
            .iter()
            .map(|id| parse_id("characterIds", id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedGeneration {
            input: HydrationInput {
                mode,
                hero_id: parse_id("heroId", &self.hero_id)?,
                character_ids,
                genre_id: parse_id("genreId", &self.genre_id)?,
                tone_id: parse_id("toneId", &self.tone_id)?,
                length_id: parse_id("lengthId", &self.length_id)?,
                growth_topic_id,
                moral_lesson_id: self
                    .moral_lesson_id
                    .as_deref()
                    .map(|id| parse_id("moralLessonId", id))
                    .transpose()?,
                custom_instructions: self
                    .custom_instructions
                    .filter(|s| !s.trim().is_empty()),
            },
            include_illustrations: self.include_illustrations,
            use_credit: self.use_credit,
        })
    }
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|_| format!("{} is not a valid id: {:?}", field, raw))
}

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub engine: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> GenerateStoryBody {
        GenerateStoryBody {
            hero_id: Uuid::new_v4().to_string(),
            mode: "fun".into(),
            genre_id: Uuid::new_v4().to_string(),
            tone_id: Uuid::new_v4().to_string(),
            length_id: Uuid::new_v4().to_string(),
            character_ids: vec![],
            growth_topic_id: None,
            moral_lesson_id: None,
            custom_instructions: None,
            include_illustrations: false,
            use_credit: false,
        }
    }

    #[test]
    fn valid_fun_body_passes() {
        assert!(body().validate().is_ok());
    }

    #[test]
    fn growth_mode_requires_a_topic() {
        let mut b = body();
        b.mode = "growth".into();
        let err = b.validate().unwrap_err();
        assert!(err.contains("growthTopicId"));
    }

    #[test]
    fn bad_uuid_is_rejected_with_the_field_name() {
        let mut b = body();
        b.genre_id = "g1".into();
        let err = b.validate().unwrap_err();
        assert!(err.contains("genreId"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut b = body();
        b.mode = "spooky".into();
        assert!(b.validate().is_err());
    }

    #[test]
    fn blank_custom_instructions_are_dropped() {
        let mut b = body();
        b.custom_instructions = Some("   ".into());
        let validated = b.validate().unwrap();
        assert_eq!(validated.input.custom_instructions, None);
    }
}
