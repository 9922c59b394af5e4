//! Engine configuration

use std::time::Duration;

use plaza_types::{BillingCycle, Plan};

/// Entitlement engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of a trial started via `start_trial`
    pub trial_period_days: i64,
    /// Plan for lazily created subscriptions
    pub default_plan: Plan,
    /// Billing cycle for lazily created subscriptions
    pub default_cycle: BillingCycle,
    /// How long subscription reads may be served from cache
    pub subscription_cache_ttl: Duration,
    /// Maximum cached subscriptions
    pub subscription_cache_capacity: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trial_period_days: 14,
            default_plan: Plan::Free,
            default_cycle: BillingCycle::Monthly,
            subscription_cache_ttl: Duration::from_secs(60),
            subscription_cache_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trial period length
    pub fn with_trial_period_days(mut self, days: i64) -> Self {
        self.trial_period_days = days;
        self
    }

    /// Set the plan used for lazily created subscriptions
    pub fn with_default_plan(mut self, plan: Plan) -> Self {
        self.default_plan = plan;
        self
    }

    /// Set the subscription cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.subscription_cache_ttl = ttl;
        self
    }
}
