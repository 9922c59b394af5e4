//! Plaza Entitlement Core - Entitlement and usage-metering engine
//!
//! The engine decides, per request, whether a user's subscription plan
//! permits an action, enforces monthly consumption limits on metered
//! features, tracks plan lifecycle transitions, and reconciles plan changes
//! against in-flight usage counters.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plaza_entitlement_core::{
//!     EngineConfig, EntitlementGuard, PlanCatalog, SubscriptionLifecycleManager, UsageMeter,
//! };
//! use plaza_types::Feature;
//!
//! let catalog = Arc::new(PlanCatalog::builtin());
//! let meter = UsageMeter::new(usage_repo, catalog.clone());
//! let lifecycle = SubscriptionLifecycleManager::new(
//!     subscription_repo,
//!     meter,
//!     EngineConfig::default(),
//! );
//! let guard = EntitlementGuard::new(lifecycle, addon_repo, catalog);
//!
//! // Gate an action
//! let decision = guard.check(user_id, Feature::Services).await?;
//! if decision.is_allowed() {
//!     // ... run the action, then commit usage on success
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod meter;
pub mod recorder;

pub use catalog::{CatalogError, PlanCatalog};
pub use config::EngineConfig;
pub use error::EntitlementError;
pub use guard::EntitlementGuard;
pub use lifecycle::SubscriptionLifecycleManager;
pub use meter::UsageMeter;
pub use recorder::{UsageEvent, UsageRecorder, UsageRecorderHandle};

// Re-export decision types from plaza-types for convenience
pub use plaza_types::{Decision, MeterReading, Reservation};
