//! Marketplace features gated by plans

use serde::{Deserialize, Serialize};

/// Features known to the entitlement engine.
///
/// A feature is either a plain capability (boolean: the plan includes it or
/// not) or additionally metered, in which case the plan carries a numeric
/// per-period limit for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Published service listings (metered)
    Services,
    /// Accepted bookings per month (metered)
    Bookings,
    /// Portfolio images on the public profile (metered)
    PortfolioImages,
    /// Seats for additional team members (metered)
    TeamMembers,
    /// In-app messaging with clients
    Messaging,
    /// Analytics dashboard
    Analytics,
    /// Placement in featured listing slots
    FeaturedListings,
    /// Programmatic API access
    ApiAccess,
    /// Custom branding on the public profile
    CustomBranding,
    /// Priority support channel
    PrioritySupport,
}

/// All known features.
pub const ALL_FEATURES: [Feature; 10] = [
    Feature::Services,
    Feature::Bookings,
    Feature::PortfolioImages,
    Feature::TeamMembers,
    Feature::Messaging,
    Feature::Analytics,
    Feature::FeaturedListings,
    Feature::ApiAccess,
    Feature::CustomBranding,
    Feature::PrioritySupport,
];

impl Feature {
    /// Stable string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Bookings => "bookings",
            Self::PortfolioImages => "portfolio_images",
            Self::TeamMembers => "team_members",
            Self::Messaging => "messaging",
            Self::Analytics => "analytics",
            Self::FeaturedListings => "featured_listings",
            Self::ApiAccess => "api_access",
            Self::CustomBranding => "custom_branding",
            Self::PrioritySupport => "priority_support",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Feature {
    type Err = FeatureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_FEATURES
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| FeatureParseError(s.to_string()))
    }
}

/// Error parsing a feature string
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown feature: {0}")]
pub struct FeatureParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_round_trip() {
        for feature in ALL_FEATURES {
            let parsed: Feature = feature.as_str().parse().unwrap();
            assert_eq!(parsed, feature);
        }
        assert!("teleportation".parse::<Feature>().is_err());
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&Feature::PortfolioImages).unwrap();
        assert_eq!(json, "\"portfolio_images\"");
    }
}
