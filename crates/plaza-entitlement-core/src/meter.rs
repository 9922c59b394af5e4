//! Usage metering
//!
//! The meter is the only component that mutates consumption state. Counters
//! live per `(user, feature, period)` with a limit snapshot taken from the
//! plan current at creation time; a new period simply produces an absent
//! counter that is created on demand, so there is no rollover job.

use std::sync::Arc;

use plaza_db::UsageRepository;
use plaza_types::{Feature, FeatureUsage, Limit, MeterReading, Period, Plan, Reservation, UserId};

use crate::catalog::PlanCatalog;
use crate::error::EntitlementError;

/// Per-period usage meter over a counter repository.
pub struct UsageMeter<U> {
    repo: Arc<U>,
    catalog: Arc<PlanCatalog>,
}

impl<U> Clone for UsageMeter<U> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl<U> std::fmt::Debug for UsageMeter<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageMeter").finish()
    }
}

impl<U: UsageRepository> UsageMeter<U> {
    /// Create a new meter
    pub fn new(repo: Arc<U>, catalog: Arc<PlanCatalog>) -> Self {
        Self { repo, catalog }
    }

    fn limit_of(&self, plan: Plan, feature: Feature) -> Result<Limit, EntitlementError> {
        self.catalog
            .limit_for(plan, feature)
            .ok_or(EntitlementError::NotMetered(feature))
    }

    fn validate_amount(amount: i64) -> Result<(), EntitlementError> {
        if amount <= 0 {
            return Err(EntitlementError::InvalidAmount(amount));
        }
        Ok(())
    }

    /// Read the counter for a period without incrementing, creating it with
    /// the current plan's limit if absent.
    pub async fn peek(
        &self,
        user_id: UserId,
        plan: Plan,
        feature: Feature,
        period: &Period,
    ) -> Result<MeterReading, EntitlementError> {
        let limit = self.limit_of(plan, feature)?;
        let row = self
            .repo
            .create_if_absent(user_id.0, feature.as_str(), &period.to_string(), limit.raw())
            .await?;

        Ok(MeterReading {
            used: row.used,
            limit: Limit::from_raw(row.limit_snapshot),
        })
    }

    /// Check whether `amount` more units fit under the period budget.
    ///
    /// Unlimited always allows. The reserve/commit pair is not atomic: two
    /// concurrent reservations can both pass with one unit of budget left,
    /// over-admitting by at most N-1 units for N racers. Callers that cannot
    /// tolerate that should use [`commit_checked`](Self::commit_checked).
    pub async fn reserve(
        &self,
        user_id: UserId,
        plan: Plan,
        feature: Feature,
        amount: i64,
        period: &Period,
    ) -> Result<Reservation, EntitlementError> {
        Self::validate_amount(amount)?;
        let reading = self.peek(user_id, plan, feature, period).await?;

        Ok(Reservation {
            allowed: reading.limit.allows(reading.used, amount),
            used: reading.used,
            limit: reading.limit,
        })
    }

    /// Unconditionally increment the counter, creating it seeded from the
    /// current plan's limit if absent. Returns the new `used`.
    ///
    /// Call this only after the gated action has definitively succeeded; a
    /// failed action must not consume budget.
    pub async fn commit(
        &self,
        user_id: UserId,
        plan: Plan,
        feature: Feature,
        amount: i64,
        period: &Period,
    ) -> Result<i64, EntitlementError> {
        Self::validate_amount(amount)?;
        let limit = self.limit_of(plan, feature)?;
        let used = self
            .repo
            .increment(
                user_id.0,
                feature.as_str(),
                &period.to_string(),
                amount,
                limit.raw(),
            )
            .await?;

        tracing::debug!(user_id = %user_id, feature = %feature, used, "usage committed");
        Ok(used)
    }

    /// Conditional increment: applies only while the result stays within the
    /// limit snapshot. `None` means the budget was exhausted between reserve
    /// and commit, and the caller treats it as a race-lost denial.
    pub async fn commit_checked(
        &self,
        user_id: UserId,
        plan: Plan,
        feature: Feature,
        amount: i64,
        period: &Period,
    ) -> Result<Option<i64>, EntitlementError> {
        Self::validate_amount(amount)?;
        let limit = self.limit_of(plan, feature)?;
        let period = period.to_string();

        // Ensure the row exists so the conditional UPDATE has a target.
        self.repo
            .create_if_absent(user_id.0, feature.as_str(), &period, limit.raw())
            .await?;

        let used = self
            .repo
            .increment_checked(user_id.0, feature.as_str(), &period, amount)
            .await?;

        Ok(used)
    }

    /// Rewrite limit snapshots of existing current-period counters to the
    /// given plan's limits. `used` is carried forward, never reset: an
    /// upgrade immediately grants the new ceiling, and a downgrade can leave
    /// the user over budget until the next period.
    pub async fn reseed(
        &self,
        user_id: UserId,
        plan: Plan,
        period: &Period,
    ) -> Result<(), EntitlementError> {
        let period = period.to_string();
        for (feature, limit) in &self.catalog.definition(plan).limits {
            self.repo
                .update_limit(user_id.0, feature.as_str(), &period, limit.raw())
                .await?;
        }

        tracing::debug!(user_id = %user_id, plan = %plan, "usage limits reseeded");
        Ok(())
    }

    /// Read-only usage map for every metered feature of the plan, without
    /// creating counters. Absent counters read as zero against the plan's
    /// current limit.
    pub async fn usage_for_period(
        &self,
        user_id: UserId,
        plan: Plan,
        period: &Period,
    ) -> Result<Vec<FeatureUsage>, EntitlementError> {
        let rows = self
            .repo
            .list_for_period(user_id.0, &period.to_string())
            .await?;

        let mut entries: Vec<FeatureUsage> = self
            .catalog
            .definition(plan)
            .limits
            .iter()
            .map(|(feature, limit)| {
                match rows.iter().find(|row| row.feature == feature.as_str()) {
                    Some(row) => {
                        FeatureUsage::new(*feature, row.used, Limit::from_raw(row.limit_snapshot))
                    }
                    None => FeatureUsage::new(*feature, 0, *limit),
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.feature.as_str());

        Ok(entries)
    }
}
