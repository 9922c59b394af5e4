//! Usage metering read models

use serde::{Deserialize, Serialize};

use crate::{Feature, Limit};

/// Point-in-time view of one usage counter, as returned by `peek`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReading {
    /// Units consumed this period
    pub used: i64,
    /// Limit snapshot for this period
    pub limit: Limit,
}

/// Outcome of a `reserve` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Whether the requested amount fits under the limit
    pub allowed: bool,
    /// Units consumed this period, before the reservation
    pub used: i64,
    /// Limit snapshot for this period
    pub limit: Limit,
}

/// Per-feature usage entry for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureUsage {
    /// The metered feature
    pub feature: Feature,
    /// Units consumed this period
    pub used: i64,
    /// Limit for this period (`-1` when unlimited)
    pub limit: Limit,
    /// `used / limit * 100`, omitted when unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

impl FeatureUsage {
    /// Build an entry, computing the percentage for finite limits
    pub fn new(feature: Feature, used: i64, limit: Limit) -> Self {
        let percentage = match limit {
            Limit::Unlimited => None,
            Limit::Capped(0) => Some(100.0),
            Limit::Capped(cap) => Some(used as f64 / cap as f64 * 100.0),
        };
        Self {
            feature,
            used,
            limit,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_for_finite_limit() {
        let usage = FeatureUsage::new(Feature::Services, 3, Limit::Capped(10));
        assert_eq!(usage.percentage, Some(30.0));
    }

    #[test]
    fn test_percentage_omitted_when_unlimited() {
        let usage = FeatureUsage::new(Feature::Services, 500, Limit::Unlimited);
        assert_eq!(usage.percentage, None);

        let json = serde_json::to_value(&usage).unwrap();
        assert!(json.get("percentage").is_none());
        assert_eq!(json["limit"], -1);
    }

    #[test]
    fn test_zero_limit_reads_as_full() {
        let usage = FeatureUsage::new(Feature::Bookings, 0, Limit::Capped(0));
        assert_eq!(usage.percentage, Some(100.0));
    }
}
