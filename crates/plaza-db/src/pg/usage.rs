//! PostgreSQL usage counter repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::UsageCounterRow;
use crate::repo::UsageRepository;

const COUNTER_COLUMNS: &str =
    "id, user_id, feature, period, used, limit_snapshot, created_at, updated_at";

/// PostgreSQL usage counter repository
#[derive(Clone)]
pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    /// Create a new usage repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    async fn find(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
    ) -> DbResult<Option<UsageCounterRow>> {
        let row = sqlx::query_as::<_, UsageCounterRow>(&format!(
            "SELECT {COUNTER_COLUMNS} FROM usage_counters \
             WHERE user_id = $1 AND feature = $2 AND period = $3"
        ))
        .bind(user_id)
        .bind(feature)
        .bind(period)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_for_period(
        &self,
        user_id: Uuid,
        period: &str,
    ) -> DbResult<Vec<UsageCounterRow>> {
        let rows = sqlx::query_as::<_, UsageCounterRow>(&format!(
            "SELECT {COUNTER_COLUMNS} FROM usage_counters \
             WHERE user_id = $1 AND period = $2 ORDER BY feature"
        ))
        .bind(user_id)
        .bind(period)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create_if_absent(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: i64,
    ) -> DbResult<UsageCounterRow> {
        sqlx::query(
            r#"
            INSERT INTO usage_counters (id, user_id, feature, period, used, limit_snapshot)
            VALUES ($1, $2, $3, $4, 0, $5)
            ON CONFLICT (user_id, feature, period) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(feature)
        .bind(period)
        .bind(limit)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, UsageCounterRow>(&format!(
            "SELECT {COUNTER_COLUMNS} FROM usage_counters \
             WHERE user_id = $1 AND feature = $2 AND period = $3"
        ))
        .bind(user_id)
        .bind(feature)
        .bind(period)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn increment(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        amount: i64,
        limit: i64,
    ) -> DbResult<i64> {
        let (used,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO usage_counters (id, user_id, feature, period, used, limit_snapshot)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, feature, period)
            DO UPDATE SET used = usage_counters.used + EXCLUDED.used, updated_at = NOW()
            RETURNING used
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(feature)
        .bind(period)
        .bind(amount)
        .bind(limit)
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }

    async fn increment_checked(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        amount: i64,
    ) -> DbResult<Option<i64>> {
        // Single atomic increment-and-check; a None result means the budget
        // was exhausted between reserve and commit.
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE usage_counters
            SET used = used + $4, updated_at = NOW()
            WHERE user_id = $1 AND feature = $2 AND period = $3
              AND (limit_snapshot = -1 OR used + $4 <= limit_snapshot)
            RETURNING used
            "#,
        )
        .bind(user_id)
        .bind(feature)
        .bind(period)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(used,)| used))
    }

    async fn update_limit(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: i64,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE usage_counters SET limit_snapshot = $4, updated_at = NOW() \
             WHERE user_id = $1 AND feature = $2 AND period = $3",
        )
        .bind(user_id)
        .bind(feature)
        .bind(period)
        .bind(limit)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
