//! Application state for the Subscription API service.

use std::sync::Arc;

use plaza_db::pg::{PgAddOnRepository, PgSubscriptionRepository, PgUsageRepository};
use plaza_db::DbPool;
use plaza_entitlement_core::{EntitlementGuard, PlanCatalog, SubscriptionLifecycleManager};

use crate::config::Config;

/// Lifecycle manager over the PostgreSQL repositories
pub type Lifecycle = SubscriptionLifecycleManager<PgSubscriptionRepository, PgUsageRepository>;

/// Entitlement guard over the PostgreSQL repositories
pub type Guard =
    EntitlementGuard<PgSubscriptionRepository, PgUsageRepository, PgAddOnRepository>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Subscription lifecycle manager (get/upgrade/cancel/trial)
    pub lifecycle: Lifecycle,
    /// Request-time entitlement decisions
    pub guard: Guard,
    /// Plan catalog
    pub catalog: Arc<PlanCatalog>,
    /// Database pool (readiness checks)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        lifecycle: Lifecycle,
        guard: Guard,
        catalog: Arc<PlanCatalog>,
        pool: DbPool,
        config: Config,
    ) -> Self {
        Self {
            lifecycle,
            guard,
            catalog,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
