//! Postgres access for the story domain.

use chrono::Utc;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::document::V3Story;
use super::{GenerationRequest, ENGINE_VERSION};
use crate::error::GenerationError;

/// A character row as stored. Gender only feeds sibling-relationship
/// derivation and never leaves hydration.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CharacterRow {
    pub id: Uuid,
    pub name: String,
    pub character_type: String,
    pub appearance: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

/// One story-parameter catalog row (genre, tone, length, growth topic,
/// moral lesson share a table, discriminated by `parameter_type`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogRow {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct StoryStore {
    pool: PgPool,
}

impl StoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Batch-fetch the user's characters for the supplied ids. Rows come
    /// back in table order; callers reorder.
    pub async fn fetch_characters(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<CharacterRow>, GenerationError> {
        let rows = sqlx::query_as::<_, CharacterRow>(
            "SELECT id, name, character_type, appearance, age, gender
             FROM characters
             WHERE id = ANY($1) AND user_id = $2",
        )
        .bind(ids)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Batch-fetch catalog rows keyed by the union of supplied ids.
    pub async fn fetch_catalog(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<CatalogRow>, GenerationError> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            "SELECT id, name, display_name, description
             FROM story_parameters
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert the completed story. A story row is written exactly once and
    /// never mutated afterwards.
    pub async fn insert_story(
        &self,
        user_id: Uuid,
        story: &V3Story,
        request: &GenerationRequest,
        include_illustrations: bool,
    ) -> Result<Uuid, GenerationError> {
        let story_id = Uuid::new_v4();
        // Text is final here; illustrated stories stay in text_complete
        // until the illustration pipeline finishes them.
        let status = if include_illustrations {
            "text_complete"
        } else {
            "complete"
        };
        let metadata = serde_json::json!({
            "story": story,
            "genre": request.genre.display_name,
            "tone": request.tone.display_name,
            "length": request.length.name,
            "mode": request.mode,
            "characters": request.characters,
            "include_illustrations": include_illustrations,
        });

        sqlx::query(
            "INSERT INTO stories
               (id, user_id, title, generation_metadata, generation_status,
                engine_version, requires_paywall, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)",
        )
        .bind(story_id)
        .bind(user_id)
        .bind(&story.title)
        .bind(&metadata)
        .bind(status)
        .bind(ENGINE_VERSION)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(%story_id, status, "story persisted");
        Ok(story_id)
    }
}
