//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SubscriptionRow;
use crate::repo::{CreateSubscription, SubscriptionRepository};

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan, status, billing_cycle, start_date, \
     end_date, trial_ends_at, cancelled_at, cancel_reason, created_at, updated_at";

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            INSERT INTO subscriptions (id, user_id, plan, status, billing_cycle,
                                       start_date, end_date, trial_ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(sub.id)
        .bind(sub.user_id)
        .bind(&sub.plan)
        .bind(&sub.status)
        .bind(&sub.billing_cycle)
        .bind(sub.start_date)
        .bind(sub.end_date)
        .bind(sub.trial_ends_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_plan(
        &self,
        id: Uuid,
        plan: &str,
        billing_cycle: &str,
        end_date: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET plan = $2, status = 'active', billing_cycle = $3, end_date = $4,
                trial_ends_at = NULL, cancelled_at = NULL, cancel_reason = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(plan)
        .bind(billing_cycle)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        cancelled_at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET status = 'cancelled', cancelled_at = $2, cancel_reason = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(cancelled_at)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn start_trial(
        &self,
        id: Uuid,
        plan: &str,
        trial_ends_at: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET plan = $2, status = 'trial', trial_ends_at = $3, end_date = NULL,
                cancelled_at = NULL, cancel_reason = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(plan)
        .bind(trial_ends_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_trial_expired(&self, id: Uuid) -> DbResult<u64> {
        // Status guard keeps the lazy expiry check idempotent under
        // concurrent reads.
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'expired', updated_at = NOW() \
             WHERE id = $1 AND status = 'trial'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_overdue_trials(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<SubscriptionRow>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE status = 'trial' AND trial_ends_at <= $1"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
