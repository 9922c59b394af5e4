//! Plaza Types - Shared domain types
//!
//! This crate contains domain types used across Plaza services:
//! - User identity
//! - Plans, capabilities, and per-feature limits
//! - Subscriptions and their lifecycle states
//! - Usage periods, counters, and entitlement decisions

pub mod addon;
pub mod decision;
pub mod feature;
pub mod period;
pub mod plan;
pub mod subscription;
pub mod usage;
pub mod user;

pub use addon::*;
pub use decision::*;
pub use feature::*;
pub use period::*;
pub use plan::*;
pub use subscription::*;
pub use usage::*;
pub use user::*;
