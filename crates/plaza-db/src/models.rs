//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Plan/status/cycle columns are stored as text and converted to domain
//! enums at the edge of the persistence layer.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub billing_cycle: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> plaza_types::UserId {
        plaza_types::UserId(self.user_id)
    }

    /// Convert to domain SubscriptionId
    pub fn subscription_id(&self) -> plaza_types::SubscriptionId {
        plaza_types::SubscriptionId(self.id)
    }
}

/// Usage counter row from the database.
///
/// At most one row per `(user_id, feature, period)`; `used` never decreases
/// within a period and `limit_snapshot` records the plan limit at counter
/// creation (or the last reseed).
#[derive(Debug, Clone, FromRow)]
pub struct UsageCounterRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feature: String,
    pub period: String,
    pub used: i64,
    pub limit_snapshot: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Add-on row from the database
#[derive(Debug, Clone, FromRow)]
pub struct AddOnRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub addon_type: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub price_cents: i64,
}
