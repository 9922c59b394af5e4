//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the subscription for a user (at most one exists)
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Create a new subscription
    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow>;

    /// Move a subscription onto a plan: active status, new cycle and end
    /// date, trial and cancellation fields cleared
    async fn update_plan(
        &self,
        id: Uuid,
        plan: &str,
        billing_cycle: &str,
        end_date: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow>;

    /// Soft-cancel: status and cancellation metadata only, plan and end date
    /// untouched
    async fn mark_cancelled(
        &self,
        id: Uuid,
        cancelled_at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DbResult<SubscriptionRow>;

    /// Put a subscription into trial on the given plan
    async fn start_trial(
        &self,
        id: Uuid,
        plan: &str,
        trial_ends_at: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow>;

    /// Transition a trial to expired. Guarded on the current status so the
    /// lazy check stays idempotent; returns rows affected (0 or 1).
    async fn mark_trial_expired(&self, id: Uuid) -> DbResult<u64>;

    /// Trials whose deadline passed before `cutoff` (sweep input)
    async fn find_overdue_trials(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<SubscriptionRow>>;
}

/// Create subscription input
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub billing_cycle: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Usage counter repository trait
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Find one counter
    async fn find(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
    ) -> DbResult<Option<UsageCounterRow>>;

    /// All counters for a user and period
    async fn list_for_period(&self, user_id: Uuid, period: &str)
        -> DbResult<Vec<UsageCounterRow>>;

    /// Create a zeroed counter with the given limit snapshot if absent,
    /// then return the row (existing or new)
    async fn create_if_absent(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: i64,
    ) -> DbResult<UsageCounterRow>;

    /// Unconditional increment (upsert). A missing counter is created with
    /// the given limit snapshot. Returns the new `used`.
    async fn increment(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        amount: i64,
        limit: i64,
    ) -> DbResult<i64>;

    /// Conditional increment: applies only if the result stays within the
    /// limit snapshot (`-1` always applies). Returns the new `used`, or
    /// `None` when the increment lost the race against the budget. The
    /// counter must already exist.
    async fn increment_checked(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        amount: i64,
    ) -> DbResult<Option<i64>>;

    /// Rewrite the limit snapshot of an existing counter; `used` is
    /// preserved. A no-op when the counter is absent.
    async fn update_limit(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: i64,
    ) -> DbResult<()>;
}

/// Add-on repository trait
#[async_trait]
pub trait AddOnRepository: Send + Sync {
    /// Active add-ons for a user
    async fn find_active_by_user(&self, user_id: Uuid) -> DbResult<Vec<AddOnRow>>;
}
