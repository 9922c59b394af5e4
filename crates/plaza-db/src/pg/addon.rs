//! PostgreSQL add-on repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::AddOnRow;
use crate::repo::AddOnRepository;

/// PostgreSQL add-on repository
#[derive(Clone)]
pub struct PgAddOnRepository {
    pool: PgPool,
}

impl PgAddOnRepository {
    /// Create a new add-on repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddOnRepository for PgAddOnRepository {
    async fn find_active_by_user(&self, user_id: Uuid) -> DbResult<Vec<AddOnRow>> {
        let rows = sqlx::query_as::<_, AddOnRow>(
            r#"
            SELECT id, user_id, addon_type, status, start_date, price_cents
            FROM add_ons
            WHERE user_id = $1 AND status = 'active'
            ORDER BY start_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
