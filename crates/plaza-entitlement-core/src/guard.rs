//! Request-time entitlement decisions
//!
//! Three checks, in order, short-circuiting on the first denial: the
//! subscription grants access, the plan (plus active add-ons) includes the
//! capability, and the per-period budget is not exhausted. Capability gating
//! and quantitative metering are independent axes; both must pass.

use std::sync::Arc;

use chrono::Utc;

use plaza_db::{AddOnRepository, AddOnRow, SubscriptionRepository, UsageRepository};
use plaza_types::{AddOn, AddOnId, Decision, Feature, Period, Plan, Subscription, UserId};

use crate::catalog::PlanCatalog;
use crate::error::EntitlementError;
use crate::lifecycle::SubscriptionLifecycleManager;

/// The request-time decision function.
///
/// The subscription is loaded per check and passed explicitly through the
/// decision path; there is no ambient request-scoped state.
pub struct EntitlementGuard<S, U, A> {
    lifecycle: SubscriptionLifecycleManager<S, U>,
    add_ons: Arc<A>,
    catalog: Arc<PlanCatalog>,
}

impl<S, U, A> Clone for EntitlementGuard<S, U, A> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            add_ons: self.add_ons.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl<S, U, A> std::fmt::Debug for EntitlementGuard<S, U, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementGuard").finish()
    }
}

impl<S, U, A> EntitlementGuard<S, U, A>
where
    S: SubscriptionRepository,
    U: UsageRepository,
    A: AddOnRepository,
{
    /// Create a new guard
    pub fn new(
        lifecycle: SubscriptionLifecycleManager<S, U>,
        add_ons: Arc<A>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            lifecycle,
            add_ons,
            catalog,
        }
    }

    /// Check whether the user may perform one unit of the feature.
    ///
    /// Loads the subscription via the lifecycle manager (which runs the lazy
    /// trial-expiry check and auto-creates a default subscription for new
    /// users).
    pub async fn check(
        &self,
        user_id: UserId,
        feature: Feature,
    ) -> Result<Decision, EntitlementError> {
        self.check_with(user_id, feature, 1).await
    }

    /// Quantity-aware form of [`check`](Self::check).
    pub async fn check_with(
        &self,
        user_id: UserId,
        feature: Feature,
        amount: i64,
    ) -> Result<Decision, EntitlementError> {
        let sub = self.lifecycle.get(user_id).await?;
        self.decide(&sub, feature, amount).await
    }

    /// Like [`check`](Self::check), but denies with `DeniedNoSubscription`
    /// instead of auto-creating a default subscription.
    pub async fn check_strict(
        &self,
        user_id: UserId,
        feature: Feature,
    ) -> Result<Decision, EntitlementError> {
        let Some(sub) = self.lifecycle.find(user_id).await? else {
            return Ok(Decision::DeniedNoSubscription);
        };
        self.decide(&sub, feature, 1).await
    }

    /// The capability half only: subscription grants access and the feature
    /// is included in the plan or an active add-on. No metering.
    pub async fn has_capability(
        &self,
        user_id: UserId,
        feature: Feature,
    ) -> Result<bool, EntitlementError> {
        let sub = self.lifecycle.get(user_id).await?;
        if !sub.has_access_at(Utc::now()) {
            return Ok(false);
        }
        self.capability_granted(sub.user_id, sub.plan, feature).await
    }

    /// Plan-hierarchy gate for entire route classes: allows iff the user's
    /// plan ranks at or above `min_plan`. Independent of capability and
    /// usage checks; an insufficient rank reads as a missing plan-level
    /// capability.
    pub async fn require_plan(
        &self,
        user_id: UserId,
        min_plan: Plan,
    ) -> Result<Decision, EntitlementError> {
        let sub = self.lifecycle.get(user_id).await?;
        if !sub.has_access_at(Utc::now()) {
            return Ok(Decision::DeniedSubscriptionInactive);
        }
        if self.catalog.rank(sub.plan) >= self.catalog.rank(min_plan) {
            Ok(Decision::Allowed)
        } else {
            Ok(Decision::DeniedPlanLacksCapability)
        }
    }

    async fn decide(
        &self,
        sub: &Subscription,
        feature: Feature,
        amount: i64,
    ) -> Result<Decision, EntitlementError> {
        if !sub.has_access_at(Utc::now()) {
            return Ok(Decision::DeniedSubscriptionInactive);
        }

        if !self
            .capability_granted(sub.user_id, sub.plan, feature)
            .await?
        {
            return Ok(Decision::DeniedPlanLacksCapability);
        }

        // Metered features additionally consume a per-period budget.
        if self.catalog.limit_for(sub.plan, feature).is_some() {
            let reservation = self
                .lifecycle
                .meter()
                .reserve(sub.user_id, sub.plan, feature, amount, &Period::current())
                .await?;
            if !reservation.allowed {
                return Ok(Decision::DeniedUsageExceeded);
            }
        }

        Ok(Decision::Allowed)
    }

    async fn capability_granted(
        &self,
        user_id: UserId,
        plan: Plan,
        feature: Feature,
    ) -> Result<bool, EntitlementError> {
        if self.catalog.has_capability(plan, feature) {
            return Ok(true);
        }

        let add_ons = self.add_ons.find_active_by_user(user_id.0).await?;
        Ok(add_ons
            .iter()
            .filter_map(addon_from_row)
            .any(|add_on| add_on.is_active() && add_on.grants() == feature))
    }
}

// Rows with unrecognized type or status strings grant nothing.
fn addon_from_row(row: &AddOnRow) -> Option<AddOn> {
    Some(AddOn {
        id: AddOnId(row.id),
        user_id: UserId(row.user_id),
        addon_type: row.addon_type.parse().ok()?,
        status: row.status.parse().ok()?,
        start_date: row.start_date,
        price_cents: row.price_cents,
    })
}
