//! Cost-log lifecycle: one row per generation attempt.
//!
//! A row is inserted with status `processing` before the upstream call and
//! moved exactly once to `completed` or `failed`. A client disconnect
//! leaves the row in `processing`; a separate sweep owns stale rows.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::GenerationError;

const PROVIDER: &str = "openai";
const OPERATION: &str = "story_generation";

#[derive(Clone)]
pub struct CostLogger {
    pool: PgPool,
}

impl CostLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open the attempt. Called before the upstream request is issued.
    pub async fn begin(
        &self,
        user_id: Uuid,
        model: &str,
        hero_character_id: Uuid,
        generation_params: &serde_json::Value,
        prompt: &str,
    ) -> Result<Uuid, GenerationError> {
        let entry_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO generation_cost_logs
               (id, user_id, provider, operation, model, character_profile_id,
                processing_status, generation_params, prompt_used, started_at)
             VALUES ($1, $2, $3, $4, $5, $6, 'processing', $7, $8, $9)",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(PROVIDER)
        .bind(OPERATION)
        .bind(model)
        .bind(hero_character_id)
        .bind(generation_params)
        .bind(prompt)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(entry_id)
    }

    /// Terminal success transition, linking the persisted story.
    pub async fn complete(
        &self,
        entry_id: Uuid,
        content_id: Uuid,
    ) -> Result<(), GenerationError> {
        sqlx::query(
            "UPDATE generation_cost_logs
             SET processing_status = 'completed', completed_at = $2, content_id = $3
             WHERE id = $1 AND processing_status = 'processing'",
        )
        .bind(entry_id)
        .bind(Utc::now())
        .bind(content_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal failure transition with the error message for debugging.
    pub async fn fail(
        &self,
        entry_id: Uuid,
        error_message: &str,
    ) -> Result<(), GenerationError> {
        sqlx::query(
            "UPDATE generation_cost_logs
             SET processing_status = 'failed', completed_at = $2, error_message = $3
             WHERE id = $1 AND processing_status = 'processing'",
        )
        .bind(entry_id)
        .bind(Utc::now())
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
