//! Subscription lifecycle management
//!
//! The lifecycle manager owns every mutation of the subscription record.
//! Trial expiry is lazy: a pure comparison of `now` against the deadline run
//! on every read, persisted through a status-guarded update so it is
//! idempotent under concurrent reads. Subscription writes are
//! last-writer-wins; concurrent upgrade and cancel resolve to whichever
//! commits last.

use std::sync::Arc;

use chrono::{Duration, Utc};
use moka::future::Cache;
use uuid::Uuid;

use plaza_db::{CreateSubscription, SubscriptionRepository, SubscriptionRow, UsageRepository};
use plaza_types::{
    BillingCycle, Period, Plan, Subscription, SubscriptionId, SubscriptionStatus, UserId,
};

use crate::config::EngineConfig;
use crate::error::EntitlementError;
use crate::meter::UsageMeter;

/// Manages subscription state transitions and reseeds usage limits when the
/// plan changes.
pub struct SubscriptionLifecycleManager<S, U> {
    subs: Arc<S>,
    meter: UsageMeter<U>,
    config: EngineConfig,
    /// Cache of user id -> subscription. The expiry check still runs on
    /// cache hits, so a cached row can never surface a stale trial.
    cache: Cache<Uuid, Subscription>,
}

impl<S, U> Clone for SubscriptionLifecycleManager<S, U> {
    fn clone(&self) -> Self {
        Self {
            subs: self.subs.clone(),
            meter: self.meter.clone(),
            config: self.config.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S, U> std::fmt::Debug for SubscriptionLifecycleManager<S, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionLifecycleManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, U> SubscriptionLifecycleManager<S, U>
where
    S: SubscriptionRepository,
    U: UsageRepository,
{
    /// Create a new lifecycle manager
    pub fn new(subs: Arc<S>, meter: UsageMeter<U>, config: EngineConfig) -> Self {
        let cache = Cache::builder()
            .time_to_live(config.subscription_cache_ttl)
            .max_capacity(config.subscription_cache_capacity)
            .build();

        Self {
            subs,
            meter,
            config,
            cache,
        }
    }

    /// The usage meter this manager reseeds on plan changes
    pub fn meter(&self) -> &UsageMeter<U> {
        &self.meter
    }

    /// Get the user's subscription, lazily creating a default one on first
    /// access. Reads never return a stale `trial` status past its deadline.
    pub async fn get(&self, user_id: UserId) -> Result<Subscription, EntitlementError> {
        if let Some(sub) = self.cache.get(&user_id.0).await {
            if !sub.trial_expired_at(Utc::now()) {
                return Ok(sub);
            }
            // Deadline passed since the row was cached; re-read and persist
            // the transition below.
        }

        let sub = match self.subs.find_by_user_id(user_id.0).await? {
            Some(row) => to_domain(row)?,
            None => self.create_default(user_id).await?,
        };
        let sub = self.expire_if_overdue(sub).await?;

        self.cache.insert(user_id.0, sub.clone()).await;
        Ok(sub)
    }

    /// Like [`get`](Self::get), but returns `None` instead of auto-creating.
    /// For callers that want strict denial on absent subscriptions.
    pub async fn find(&self, user_id: UserId) -> Result<Option<Subscription>, EntitlementError> {
        let Some(row) = self.subs.find_by_user_id(user_id.0).await? else {
            return Ok(None);
        };
        let sub = self.expire_if_overdue(to_domain(row)?).await?;

        self.cache.insert(user_id.0, sub.clone()).await;
        Ok(Some(sub))
    }

    /// Move the user onto a plan: status becomes `active`, the end date is
    /// recomputed from the billing cycle, and current-period usage limits
    /// are reseeded to the new plan (used carried forward). Revives expired
    /// and cancelled subscriptions.
    pub async fn upgrade(
        &self,
        user_id: UserId,
        new_plan: Plan,
        cycle: BillingCycle,
    ) -> Result<Subscription, EntitlementError> {
        let current = self.get(user_id).await?;
        let now = Utc::now();

        let row = self
            .subs
            .update_plan(
                current.id.0,
                new_plan.as_str(),
                cycle.as_str(),
                cycle.period_end(now),
            )
            .await?;
        let sub = to_domain(row)?;

        self.meter
            .reseed(user_id, new_plan, &Period::containing(now))
            .await?;
        self.cache.invalidate(&user_id.0).await;

        tracing::info!(
            user_id = %user_id,
            from = %current.plan,
            to = %new_plan,
            cycle = %cycle,
            "subscription plan changed"
        );
        Ok(sub)
    }

    /// Soft-cancel: access is retained until `end_date`. A subscription
    /// that never had an end date loses access immediately.
    pub async fn cancel(
        &self,
        user_id: UserId,
        reason: Option<&str>,
    ) -> Result<Subscription, EntitlementError> {
        let current = self.get(user_id).await?;

        let row = self
            .subs
            .mark_cancelled(current.id.0, Utc::now(), reason)
            .await?;
        let sub = to_domain(row)?;

        self.cache.invalidate(&user_id.0).await;

        tracing::info!(user_id = %user_id, plan = %sub.plan, "subscription cancelled");
        Ok(sub)
    }

    /// Start a trial of the given plan, ending after the configured trial
    /// period.
    pub async fn start_trial(
        &self,
        user_id: UserId,
        plan: Plan,
    ) -> Result<Subscription, EntitlementError> {
        let current = self.get(user_id).await?;
        let deadline = Utc::now() + Duration::days(self.config.trial_period_days);

        let row = self
            .subs
            .start_trial(current.id.0, plan.as_str(), deadline)
            .await?;
        let sub = to_domain(row)?;

        self.cache.invalidate(&user_id.0).await;

        tracing::info!(user_id = %user_id, plan = %plan, trial_ends_at = %deadline, "trial started");
        Ok(sub)
    }

    /// Sweep variant of the lazy expiry check, for operators who want
    /// tighter bounds than query-time detection. Idempotent; returns the
    /// number of subscriptions transitioned.
    pub async fn expire_overdue_trials(&self) -> Result<u64, EntitlementError> {
        let overdue = self.subs.find_overdue_trials(Utc::now()).await?;

        let mut expired = 0;
        for row in overdue {
            expired += self.subs.mark_trial_expired(row.id).await?;
            self.cache.invalidate(&row.user_id).await;
        }

        if expired > 0 {
            tracing::info!(count = expired, "expired overdue trials");
        }
        Ok(expired)
    }

    async fn create_default(&self, user_id: UserId) -> Result<Subscription, EntitlementError> {
        let now = Utc::now();
        let row = self
            .subs
            .create(CreateSubscription {
                id: Uuid::new_v4(),
                user_id: user_id.0,
                plan: self.config.default_plan.as_str().to_string(),
                status: SubscriptionStatus::Active.as_str().to_string(),
                billing_cycle: self.config.default_cycle.as_str().to_string(),
                start_date: now,
                end_date: None,
                trial_ends_at: None,
            })
            .await?;

        tracing::info!(user_id = %user_id, plan = %self.config.default_plan, "default subscription created");
        to_domain(row)
    }

    async fn expire_if_overdue(
        &self,
        mut sub: Subscription,
    ) -> Result<Subscription, EntitlementError> {
        if sub.trial_expired_at(Utc::now()) {
            let transitioned = self.subs.mark_trial_expired(sub.id.0).await?;
            if transitioned > 0 {
                tracing::info!(user_id = %sub.user_id, plan = %sub.plan, "trial expired");
            }
            sub.status = SubscriptionStatus::Expired;
        }
        Ok(sub)
    }
}

fn to_domain(row: SubscriptionRow) -> Result<Subscription, EntitlementError> {
    let plan: Plan = row
        .plan
        .parse()
        .map_err(|_| EntitlementError::UnknownPlan(row.plan.clone()))?;
    let status: SubscriptionStatus = row
        .status
        .parse()
        .map_err(|_| EntitlementError::CorruptRow(format!("status {:?}", row.status)))?;
    let billing_cycle: BillingCycle = row
        .billing_cycle
        .parse()
        .map_err(|_| EntitlementError::CorruptRow(format!("billing_cycle {:?}", row.billing_cycle)))?;

    Ok(Subscription {
        id: SubscriptionId(row.id),
        user_id: UserId(row.user_id),
        plan,
        status,
        billing_cycle,
        start_date: row.start_date,
        end_date: row.end_date,
        trial_ends_at: row.trial_ends_at,
        cancelled_at: row.cancelled_at,
        cancel_reason: row.cancel_reason,
        created_at: row.created_at,
    })
}
