//! Shared test fixtures over the in-memory repositories

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use plaza_db::memory::{
    MemoryAddOnRepository, MemorySubscriptionRepository, MemoryUsageRepository,
};
use plaza_db::UsageCounterRow;
use plaza_entitlement_core::{
    EngineConfig, EntitlementGuard, PlanCatalog, SubscriptionLifecycleManager, UsageMeter,
};

/// Fully wired engine over in-memory repositories
#[allow(dead_code)] // not every test binary touches every handle
pub struct TestEngine {
    pub subs: Arc<MemorySubscriptionRepository>,
    pub usage: Arc<MemoryUsageRepository>,
    pub add_ons: Arc<MemoryAddOnRepository>,
    pub lifecycle:
        SubscriptionLifecycleManager<MemorySubscriptionRepository, MemoryUsageRepository>,
    pub guard: EntitlementGuard<
        MemorySubscriptionRepository,
        MemoryUsageRepository,
        MemoryAddOnRepository,
    >,
}

/// Build an engine with the built-in catalog and default config
pub fn engine() -> TestEngine {
    let subs = Arc::new(MemorySubscriptionRepository::new());
    let usage = Arc::new(MemoryUsageRepository::new());
    let add_ons = Arc::new(MemoryAddOnRepository::new());
    let catalog = Arc::new(PlanCatalog::builtin());

    let meter = UsageMeter::new(usage.clone(), catalog.clone());
    let lifecycle = SubscriptionLifecycleManager::new(subs.clone(), meter, EngineConfig::default());
    let guard = EntitlementGuard::new(lifecycle.clone(), add_ons.clone(), catalog);

    TestEngine {
        subs,
        usage,
        add_ons,
        lifecycle,
        guard,
    }
}

/// Build a usage counter row for direct insertion
pub fn counter_row(user_id: Uuid, feature: &str, period: &str, used: i64, limit: i64) -> UsageCounterRow {
    UsageCounterRow {
        id: Uuid::new_v4(),
        user_id,
        feature: feature.to_string(),
        period: period.to_string(),
        used,
        limit_snapshot: limit,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
