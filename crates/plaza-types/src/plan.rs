//! Subscription plan types

use std::collections::{HashMap, HashSet};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Feature;

/// Subscription plan tiers, ordered lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free plan - default for every user
    Free,
    /// Professional plan - $29/mo
    Professional,
    /// Business plan - $79/mo
    Business,
    /// Elite plan - $199/mo, no limits
    Elite,
}

/// All plans, in rank order.
pub const ALL_PLANS: [Plan; 4] = [
    Plan::Free,
    Plan::Professional,
    Plan::Business,
    Plan::Elite,
];

impl Plan {
    /// Numeric rank for hierarchy comparisons (`Free` is 0)
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Professional => 1,
            Self::Business => 2,
            Self::Elite => 3,
        }
    }

    /// Stable string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Professional => "professional",
            Self::Business => "business",
            Self::Elite => "elite",
        }
    }
}

impl PartialOrd for Plan {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Plan {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = PlanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "professional" | "pro" => Ok(Self::Professional),
            "business" => Ok(Self::Business),
            "elite" => Ok(Self::Elite),
            _ => Err(PlanParseError(s.to_string())),
        }
    }
}

/// Error parsing a plan string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid plan: {0}")]
pub struct PlanParseError(pub String);

/// A per-feature consumption ceiling.
///
/// `-1` is the only unlimited marker, end-to-end: it is what gets persisted
/// into counter rows and what appears on the wire. Comparisons special-case
/// the unlimited variant instead of relying on a large sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// No ceiling for this feature
    Unlimited,
    /// At most this many units per period
    Capped(i64),
}

impl Limit {
    /// Raw value persisted for the unlimited marker
    pub const UNLIMITED_RAW: i64 = -1;

    /// Decode from the persisted representation
    pub const fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::Unlimited
        } else {
            Self::Capped(raw)
        }
    }

    /// Encode to the persisted representation
    pub const fn raw(&self) -> i64 {
        match self {
            Self::Unlimited => Self::UNLIMITED_RAW,
            Self::Capped(n) => *n,
        }
    }

    /// Whether this limit has no ceiling
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Whether `used + amount` still fits under the ceiling
    pub const fn allows(&self, used: i64, amount: i64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Capped(limit) => used + amount <= *limit,
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Capped(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.raw())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < -1 {
            return Err(D::Error::custom(format!(
                "invalid limit {raw}: only -1 marks unlimited"
            )));
        }
        Ok(Self::from_raw(raw))
    }
}

/// Immutable definition of a plan: price, commission, capability set,
/// and per-feature limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDefinition {
    /// Plan identifier
    pub id: Plan,
    /// Human-readable name
    pub display_name: String,
    /// Monthly price in cents
    pub monthly_price_cents: i64,
    /// Marketplace commission in basis points
    pub commission_rate_bps: u32,
    /// Boolean capability flags granted by this plan
    pub capabilities: HashSet<Feature>,
    /// Numeric per-period limits for metered features
    pub limits: HashMap<Feature, Limit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ordering() {
        assert!(Plan::Free.rank() < Plan::Professional.rank());
        assert!(Plan::Professional.rank() < Plan::Business.rank());
        assert!(Plan::Business.rank() < Plan::Elite.rank());
        assert!(Plan::Free < Plan::Elite);
    }

    #[test]
    fn test_plan_round_trip() {
        for plan in ALL_PLANS {
            let parsed: Plan = plan.as_str().parse().unwrap();
            assert_eq!(parsed, plan);
        }
        assert_eq!("pro".parse::<Plan>().unwrap(), Plan::Professional);
        assert!("platinum".parse::<Plan>().is_err());
    }

    #[test]
    fn test_limit_raw_round_trip() {
        assert_eq!(Limit::from_raw(-1), Limit::Unlimited);
        assert_eq!(Limit::from_raw(10), Limit::Capped(10));
        assert_eq!(Limit::Unlimited.raw(), -1);
        assert_eq!(Limit::Capped(3).raw(), 3);
    }

    #[test]
    fn test_limit_allows() {
        assert!(Limit::Unlimited.allows(i64::MAX - 1, 1));
        assert!(Limit::Capped(3).allows(2, 1));
        assert!(!Limit::Capped(3).allows(3, 1));
        assert!(!Limit::Capped(0).allows(0, 1));
    }

    #[test]
    fn test_limit_serde_is_raw_integer() {
        let json = serde_json::to_string(&Limit::Unlimited).unwrap();
        assert_eq!(json, "-1");
        let json = serde_json::to_string(&Limit::Capped(10)).unwrap();
        assert_eq!(json, "10");

        let limit: Limit = serde_json::from_str("-1").unwrap();
        assert_eq!(limit, Limit::Unlimited);
        assert!(serde_json::from_str::<Limit>("-2").is_err());
    }
}
