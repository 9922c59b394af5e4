//! In-memory repository implementations for development and testing
//!
//! Same contracts as the PostgreSQL implementations, backed by concurrent
//! maps. The conditional-increment and status-guard semantics mirror the SQL
//! statements they stand in for.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{AddOnRow, SubscriptionRow, UsageCounterRow};
use crate::repo::{AddOnRepository, CreateSubscription, SubscriptionRepository, UsageRepository};

/// In-memory subscription repository
#[derive(Default, Clone)]
pub struct MemorySubscriptionRepository {
    rows: Arc<DashMap<Uuid, SubscriptionRow>>,
    by_user: Arc<DashMap<Uuid, Uuid>>,
}

impl MemorySubscriptionRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the create path
    pub fn insert(&self, row: SubscriptionRow) {
        self.by_user.insert(row.user_id, row.id);
        self.rows.insert(row.id, row);
    }

    /// Number of stored subscriptions
    pub fn count(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .by_user
            .get(&user_id)
            .and_then(|id| self.rows.get(id.value()).map(|r| r.value().clone())))
    }

    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let row = SubscriptionRow {
            id: sub.id,
            user_id: sub.user_id,
            plan: sub.plan,
            status: sub.status,
            billing_cycle: sub.billing_cycle,
            start_date: sub.start_date,
            end_date: sub.end_date,
            trial_ends_at: sub.trial_ends_at,
            cancelled_at: None,
            cancel_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.insert(row.clone());
        Ok(row)
    }

    async fn update_plan(
        &self,
        id: Uuid,
        plan: &str,
        billing_cycle: &str,
        end_date: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow> {
        let mut row = self.rows.get_mut(&id).ok_or(DbError::NotFound)?;
        row.plan = plan.to_string();
        row.status = "active".to_string();
        row.billing_cycle = billing_cycle.to_string();
        row.end_date = Some(end_date);
        row.trial_ends_at = None;
        row.cancelled_at = None;
        row.cancel_reason = None;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn mark_cancelled(
        &self,
        id: Uuid,
        cancelled_at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DbResult<SubscriptionRow> {
        let mut row = self.rows.get_mut(&id).ok_or(DbError::NotFound)?;
        row.status = "cancelled".to_string();
        row.cancelled_at = Some(cancelled_at);
        row.cancel_reason = reason.map(String::from);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn start_trial(
        &self,
        id: Uuid,
        plan: &str,
        trial_ends_at: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow> {
        let mut row = self.rows.get_mut(&id).ok_or(DbError::NotFound)?;
        row.plan = plan.to_string();
        row.status = "trial".to_string();
        row.trial_ends_at = Some(trial_ends_at);
        row.end_date = None;
        row.cancelled_at = None;
        row.cancel_reason = None;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn mark_trial_expired(&self, id: Uuid) -> DbResult<u64> {
        if let Some(mut row) = self.rows.get_mut(&id) {
            if row.status == "trial" {
                row.status = "expired".to_string();
                row.updated_at = Utc::now();
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn find_overdue_trials(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<SubscriptionRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                r.status == "trial" && r.trial_ends_at.is_some_and(|deadline| deadline <= cutoff)
            })
            .map(|r| r.value().clone())
            .collect())
    }
}

/// In-memory usage counter repository
#[derive(Default, Clone)]
pub struct MemoryUsageRepository {
    counters: Arc<DashMap<(Uuid, String, String), UsageCounterRow>>,
}

impl MemoryUsageRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a counter row directly
    pub fn insert(&self, row: UsageCounterRow) {
        let key = (row.user_id, row.feature.clone(), row.period.clone());
        self.counters.insert(key, row);
    }

    /// Number of stored counters
    pub fn count(&self) -> usize {
        self.counters.len()
    }
}

fn new_counter(user_id: Uuid, feature: &str, period: &str, limit: i64) -> UsageCounterRow {
    UsageCounterRow {
        id: Uuid::new_v4(),
        user_id,
        feature: feature.to_string(),
        period: period.to_string(),
        used: 0,
        limit_snapshot: limit,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl UsageRepository for MemoryUsageRepository {
    async fn find(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
    ) -> DbResult<Option<UsageCounterRow>> {
        let key = (user_id, feature.to_string(), period.to_string());
        Ok(self.counters.get(&key).map(|r| r.value().clone()))
    }

    async fn list_for_period(
        &self,
        user_id: Uuid,
        period: &str,
    ) -> DbResult<Vec<UsageCounterRow>> {
        let mut rows: Vec<UsageCounterRow> = self
            .counters
            .iter()
            .filter(|r| r.user_id == user_id && r.period == period)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| a.feature.cmp(&b.feature));
        Ok(rows)
    }

    async fn create_if_absent(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: i64,
    ) -> DbResult<UsageCounterRow> {
        let key = (user_id, feature.to_string(), period.to_string());
        let row = self
            .counters
            .entry(key)
            .or_insert_with(|| new_counter(user_id, feature, period, limit));
        Ok(row.value().clone())
    }

    async fn increment(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        amount: i64,
        limit: i64,
    ) -> DbResult<i64> {
        let key = (user_id, feature.to_string(), period.to_string());
        let mut row = self
            .counters
            .entry(key)
            .or_insert_with(|| new_counter(user_id, feature, period, limit));
        row.used += amount;
        row.updated_at = Utc::now();
        Ok(row.used)
    }

    async fn increment_checked(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        amount: i64,
    ) -> DbResult<Option<i64>> {
        let key = (user_id, feature.to_string(), period.to_string());
        match self.counters.get_mut(&key) {
            Some(mut row) => {
                if row.limit_snapshot == -1 || row.used + amount <= row.limit_snapshot {
                    row.used += amount;
                    row.updated_at = Utc::now();
                    Ok(Some(row.used))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    async fn update_limit(
        &self,
        user_id: Uuid,
        feature: &str,
        period: &str,
        limit: i64,
    ) -> DbResult<()> {
        let key = (user_id, feature.to_string(), period.to_string());
        if let Some(mut row) = self.counters.get_mut(&key) {
            row.limit_snapshot = limit;
            row.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// In-memory add-on repository
#[derive(Default, Clone)]
pub struct MemoryAddOnRepository {
    rows: Arc<DashMap<Uuid, AddOnRow>>,
}

impl MemoryAddOnRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an add-on row directly
    pub fn insert(&self, row: AddOnRow) {
        self.rows.insert(row.id, row);
    }
}

#[async_trait]
impl AddOnRepository for MemoryAddOnRepository {
    async fn find_active_by_user(&self, user_id: Uuid) -> DbResult<Vec<AddOnRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.user_id == user_id && r.status == "active")
            .map(|r| r.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_crud() {
        let repo = MemorySubscriptionRepository::new();
        let user_id = Uuid::new_v4();

        let row = repo
            .create(CreateSubscription {
                id: Uuid::new_v4(),
                user_id,
                plan: "free".to_string(),
                status: "active".to_string(),
                billing_cycle: "monthly".to_string(),
                start_date: Utc::now(),
                end_date: None,
                trial_ends_at: None,
            })
            .await
            .unwrap();

        let found = repo.find_by_user_id(user_id).await.unwrap().unwrap();
        assert_eq!(found.id, row.id);

        repo.update_plan(row.id, "business", "annual", Utc::now())
            .await
            .unwrap();
        let found = repo.find_by_user_id(user_id).await.unwrap().unwrap();
        assert_eq!(found.plan, "business");
        assert_eq!(found.status, "active");

        repo.mark_cancelled(row.id, Utc::now(), Some("testing"))
            .await
            .unwrap();
        let found = repo.find_by_user_id(user_id).await.unwrap().unwrap();
        assert_eq!(found.status, "cancelled");
        assert_eq!(found.cancel_reason.as_deref(), Some("testing"));
    }

    #[tokio::test]
    async fn test_mark_trial_expired_is_status_guarded() {
        let repo = MemorySubscriptionRepository::new();
        let user_id = Uuid::new_v4();

        let row = repo
            .create(CreateSubscription {
                id: Uuid::new_v4(),
                user_id,
                plan: "professional".to_string(),
                status: "active".to_string(),
                billing_cycle: "monthly".to_string(),
                start_date: Utc::now(),
                end_date: None,
                trial_ends_at: None,
            })
            .await
            .unwrap();

        // Not a trial, nothing to expire
        assert_eq!(repo.mark_trial_expired(row.id).await.unwrap(), 0);

        repo.start_trial(row.id, "professional", Utc::now())
            .await
            .unwrap();
        assert_eq!(repo.mark_trial_expired(row.id).await.unwrap(), 1);
        assert_eq!(repo.mark_trial_expired(row.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_usage_increment_and_checked() {
        let repo = MemoryUsageRepository::new();
        let user_id = Uuid::new_v4();

        assert_eq!(
            repo.increment(user_id, "services", "2025-01", 2, 3)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            repo.increment_checked(user_id, "services", "2025-01", 1)
                .await
                .unwrap(),
            Some(3)
        );
        assert_eq!(
            repo.increment_checked(user_id, "services", "2025-01", 1)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_addon_filtering() {
        let repo = MemoryAddOnRepository::new();
        let user_id = Uuid::new_v4();

        repo.insert(AddOnRow {
            id: Uuid::new_v4(),
            user_id,
            addon_type: "analytics".to_string(),
            status: "active".to_string(),
            start_date: Utc::now(),
            price_cents: 900,
        });
        repo.insert(AddOnRow {
            id: Uuid::new_v4(),
            user_id,
            addon_type: "api_access".to_string(),
            status: "cancelled".to_string(),
            start_date: Utc::now(),
            price_cents: 1900,
        });

        let active = repo.find_active_by_user(user_id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].addon_type, "analytics");
    }
}
