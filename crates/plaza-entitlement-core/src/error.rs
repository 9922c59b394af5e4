//! Engine errors
//!
//! Entitlement denials are not errors; they travel as [`plaza_types::Decision`]
//! values. The variants here are either boundary-validation rejections or
//! infrastructure failures, and the two are kept distinct so a storage outage
//! can never masquerade as "usage exceeded".

use plaza_types::Feature;
use thiserror::Error;

/// Entitlement engine errors
#[derive(Error, Debug)]
pub enum EntitlementError {
    /// A persisted plan identifier is not in the catalog. Configuration
    /// integrity failure, surfaced as a 500.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    /// A persisted subscription row failed domain conversion
    #[error("corrupt subscription row: {0}")]
    CorruptRow(String),

    /// The feature carries no numeric limit on the given plan
    #[error("feature is not metered: {0}")]
    NotMetered(Feature),

    /// Usage amounts must be positive; consumption never decreases
    #[error("invalid usage amount: {0}")]
    InvalidAmount(i64),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] plaza_db::DbError),
}
