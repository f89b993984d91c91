// src/state.rs
// Shared application state handed to every handler.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::CONFIG;
use crate::llm::OpenAiClient;
use crate::story::store::StoryStore;
use crate::usage::{CostLogger, UsageLedger};

pub struct AppState {
    pub pool: PgPool,
    pub stories: StoryStore,
    pub ledger: UsageLedger,
    pub costs: CostLogger,
    pub openai: OpenAiClient,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>> {
        let pool = PgPoolOptions::new()
            .max_connections(CONFIG.pg_max_connections)
            .connect(&CONFIG.database_url)
            .await?;
        info!(max_connections = CONFIG.pg_max_connections, "database pool ready");

        Ok(Arc::new(Self {
            stories: StoryStore::new(pool.clone()),
            ledger: UsageLedger::new(pool.clone()),
            costs: CostLogger::new(pool.clone()),
            openai: OpenAiClient::new()?,
            pool,
        }))
    }

    /// Build state around an existing pool. Used by tests.
    pub fn with_pool(pool: PgPool) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            stories: StoryStore::new(pool.clone()),
            ledger: UsageLedger::new(pool.clone()),
            costs: CostLogger::new(pool.clone()),
            openai: OpenAiClient::new()?,
            pool,
        }))
    }
}
