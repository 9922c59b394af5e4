//! Shared test fixtures over the in-memory repositories

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use plaza_db::memory::{
    MemoryAddOnRepository, MemorySubscriptionRepository, MemoryUsageRepository,
};
use plaza_db::{AddOnRow, SubscriptionRow};
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

/// Build a subscription row with sensible defaults for direct insertion
#[allow(dead_code)]
pub fn subscription_row(user_id: Uuid, plan: &str, status: &str) -> SubscriptionRow {
    SubscriptionRow {
        id: Uuid::new_v4(),
        user_id,
        plan: plan.to_string(),
        status: status.to_string(),
        billing_cycle: "monthly".to_string(),
        start_date: Utc::now(),
        end_date: None,
        trial_ends_at: None,
        cancelled_at: None,
        cancel_reason: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Build an add-on row for direct insertion
#[allow(dead_code)]
pub fn addon_row(user_id: Uuid, addon_type: &str, status: &str) -> AddOnRow {
    AddOnRow {
        id: Uuid::new_v4(),
        user_id,
        addon_type: addon_type.to_string(),
        status: status.to_string(),
        start_date: Utc::now(),
        price_cents: 900,
    }
}
