//! Usage accounting: the generation gate and post-completion debits.
//!
//! The gate runs before any upstream call. Debits run exactly once per
//! successful completion and never on failure; a failed debit is logged
//! and swallowed because the story already exists and has been announced
//! to the client.

pub mod cost;

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::config::CONFIG;
use crate::error::{GenerationError, UsageReason};

pub use cost::CostLogger;

/// The usage columns of a user profile, read in one query.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct UsageSnapshot {
    pub has_active_subscription: bool,
    pub monthly_text_stories: i32,
    pub monthly_illustrated_stories: i32,
    pub story_credits: i32,
    pub total_story_count: i32,
}

/// Everything the gate needs, denormalised so the decision is a pure
/// function over plain values.
#[derive(Debug, Clone, Copy)]
pub struct GateInput {
    pub has_subscription: bool,
    pub monthly_used: i32,
    pub monthly_limit: i32,
    pub total_stories: i32,
    pub free_limit: i32,
    pub credits: i32,
    pub use_credit: bool,
}

/// Yes/no generation gate. Subscribers are bounded by the monthly counter
/// for the requested story kind; free users get `free_limit` lifetime
/// stories, after which only a pre-purchased credit lets one through.
pub fn evaluate_gate(input: &GateInput) -> Result<(), UsageReason> {
    if input.has_subscription {
        if input.monthly_used >= input.monthly_limit {
            return Err(UsageReason::SubscriptionLimitReached);
        }
        return Ok(());
    }
    if input.use_credit && input.credits > 0 {
        return Ok(());
    }
    if input.total_stories >= input.free_limit {
        return Err(UsageReason::PaywallRequired);
    }
    Ok(())
}

/// The second story a free user ever generates gets flagged for the
/// paywall; the third is blocked by the gate before generation starts.
pub fn paywall_flag_required(new_total_count: i32, has_subscription: bool) -> bool {
    new_total_count == 2 && !has_subscription
}

#[derive(Clone)]
pub struct UsageLedger {
    pool: PgPool,
}

impl UsageLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_snapshot(&self, user_id: Uuid) -> Result<UsageSnapshot, GenerationError> {
        let snapshot = sqlx::query_as::<_, UsageSnapshot>(
            "SELECT has_active_subscription, monthly_text_stories,
                    monthly_illustrated_stories, story_credits, total_story_count
             FROM user_profiles
             WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GenerationError::Unauthorized)?;
        Ok(snapshot)
    }

    /// Gate check. Re-run immediately before the upstream call even when an
    /// earlier layer already checked, so a concurrent completion between
    /// check-time and generate-time cannot sneak past the limit.
    pub async fn check_generation(
        &self,
        user_id: Uuid,
        include_illustrations: bool,
        use_credit: bool,
    ) -> Result<UsageSnapshot, GenerationError> {
        let snapshot = self.fetch_snapshot(user_id).await?;
        let (monthly_used, monthly_limit) = if include_illustrations {
            (
                snapshot.monthly_illustrated_stories,
                CONFIG.monthly_illustrated_story_limit as i32,
            )
        } else {
            (
                snapshot.monthly_text_stories,
                CONFIG.monthly_text_story_limit as i32,
            )
        };
        evaluate_gate(&GateInput {
            has_subscription: snapshot.has_active_subscription,
            monthly_used,
            monthly_limit,
            total_stories: snapshot.total_story_count,
            free_limit: CONFIG.free_story_limit as i32,
            credits: snapshot.story_credits,
            use_credit,
        })
        .map_err(|reason| GenerationError::UsageLimit { reason })?;
        Ok(snapshot)
    }

    pub async fn increment_usage(
        &self,
        user_id: Uuid,
        include_illustrations: bool,
    ) -> Result<(), GenerationError> {
        let column = if include_illustrations {
            "monthly_illustrated_stories"
        } else {
            "monthly_text_stories"
        };
        let sql = format!(
            "UPDATE user_profiles SET {column} = {column} + 1 WHERE user_id = $1"
        );
        sqlx::query(&sql).bind(user_id).execute(&self.pool).await?;
        Ok(())
    }

    /// Lifetime counter across all engines. Returns the new count.
    pub async fn increment_total_story_count(
        &self,
        user_id: Uuid,
    ) -> Result<i32, GenerationError> {
        let (new_count,): (i32,) = sqlx::query_as(
            "UPDATE user_profiles
             SET total_story_count = total_story_count + 1
             WHERE user_id = $1
             RETURNING total_story_count",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(new_count)
    }

    pub async fn consume_generation_credit(
        &self,
        user_id: Uuid,
    ) -> Result<(), GenerationError> {
        sqlx::query(
            "UPDATE user_profiles
             SET story_credits = story_credits - 1
             WHERE user_id = $1 AND story_credits > 0",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_story_requires_paywall(
        &self,
        story_id: Uuid,
    ) -> Result<(), GenerationError> {
        sqlx::query("UPDATE stories SET requires_paywall = TRUE WHERE id = $1")
            .bind(story_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Post-completion bookkeeping. The story row and the `complete` event
    /// exist regardless of what happens here, so every failure is logged
    /// and swallowed.
    pub async fn settle_completion(
        &self,
        user_id: Uuid,
        story_id: Uuid,
        include_illustrations: bool,
        spent_credit: bool,
        has_subscription: bool,
    ) {
        if let Err(e) = self.increment_usage(user_id, include_illustrations).await {
            warn!(%user_id, error = %e, "failed to increment monthly usage");
        }
        match self.increment_total_story_count(user_id).await {
            Ok(new_count) => {
                if paywall_flag_required(new_count, has_subscription) {
                    if let Err(e) = self.mark_story_requires_paywall(story_id).await {
                        warn!(%story_id, error = %e, "failed to set paywall flag");
                    }
                }
            }
            Err(e) => warn!(%user_id, error = %e, "failed to increment story count"),
        }
        if spent_credit {
            if let Err(e) = self.consume_generation_credit(user_id).await {
                warn!(%user_id, error = %e, "failed to consume story credit");
            }
        }
    }
}
