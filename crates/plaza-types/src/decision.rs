//! Entitlement decisions

use serde::{Deserialize, Serialize};

/// The allow/deny outcome of an entitlement check.
///
/// Denials are expected, user-facing outcomes carried as values with a
/// stable reason code; they are never surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// All checks passed
    Allowed,
    /// No subscription row exists (strict checks only)
    DeniedNoSubscription,
    /// Subscription is expired, or cancelled past its end date
    DeniedSubscriptionInactive,
    /// The plan (plus active add-ons) does not include the capability
    DeniedPlanLacksCapability,
    /// The per-period budget for the feature is exhausted
    DeniedUsageExceeded,
}

impl Decision {
    /// Whether the action may proceed
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Stable reason code for API responses
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Allowed => "ALLOWED",
            Self::DeniedNoSubscription => "NO_SUBSCRIPTION",
            Self::DeniedSubscriptionInactive => "SUBSCRIPTION_INACTIVE",
            Self::DeniedPlanLacksCapability => "PLAN_LACKS_CAPABILITY",
            Self::DeniedUsageExceeded => "USAGE_EXCEEDED",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason_code())
    }
}
