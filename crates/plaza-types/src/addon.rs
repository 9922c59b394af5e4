//! Add-on purchases outside the plan

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Feature, UserId};

/// Unique add-on identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddOnId(pub Uuid);

impl AddOnId {
    /// Create a new random add-on ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AddOnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AddOnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Purchasable add-on kinds. Each grants one capability on top of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnType {
    /// Featured listing placement without a Professional plan
    FeaturedListings,
    /// Analytics dashboard without a Professional plan
    Analytics,
    /// API access without a Business plan
    ApiAccess,
}

impl AddOnType {
    /// Stable string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FeaturedListings => "featured_listings",
            Self::Analytics => "analytics",
            Self::ApiAccess => "api_access",
        }
    }

    /// The capability this add-on grants
    pub const fn grants(&self) -> Feature {
        match self {
            Self::FeaturedListings => Feature::FeaturedListings,
            Self::Analytics => Feature::Analytics,
            Self::ApiAccess => Feature::ApiAccess,
        }
    }
}

impl std::fmt::Display for AddOnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AddOnType {
    type Err = AddOnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured_listings" => Ok(Self::FeaturedListings),
            "analytics" => Ok(Self::Analytics),
            "api_access" => Ok(Self::ApiAccess),
            _ => Err(AddOnParseError(s.to_string())),
        }
    }
}

/// Error parsing an add-on type string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid add-on type: {0}")]
pub struct AddOnParseError(pub String);

/// Add-on status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOnStatus {
    /// Add-on is active and widens the capability set
    Active,
    /// Add-on was cancelled
    Cancelled,
}

impl AddOnStatus {
    /// Stable string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for AddOnStatus {
    type Err = AddOnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(AddOnParseError(s.to_string())),
        }
    }
}

/// A capability purchased outside the plan.
///
/// Active add-ons widen the capability set checked by the entitlement guard;
/// they never interact with the usage meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOn {
    /// Add-on ID
    pub id: AddOnId,
    /// User who purchased the add-on
    pub user_id: UserId,
    /// Add-on kind
    pub addon_type: AddOnType,
    /// Add-on status
    pub status: AddOnStatus,
    /// When the add-on became active
    pub start_date: DateTime<Utc>,
    /// Monthly price in cents
    pub price_cents: i64,
}

impl AddOn {
    /// Whether this add-on currently widens the capability set
    pub fn is_active(&self) -> bool {
        self.status == AddOnStatus::Active
    }

    /// The capability this add-on grants
    pub fn grants(&self) -> Feature {
        self.addon_type.grants()
    }
}
