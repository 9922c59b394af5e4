//! Subscription types

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Plan, UserId};

/// Unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Create a new random subscription ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In trial period
    Trial,
    /// Subscription is active
    Active,
    /// Cancelled by the user; access retained until `end_date`
    Cancelled,
    /// Trial deadline passed without an upgrade
    Expired,
}

impl SubscriptionStatus {
    /// Stable string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

/// Error parsing a subscription status string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid subscription status: {0}")]
pub struct StatusParseError(pub String);

/// Billing cycle for a paid subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    /// Billed every month
    Monthly,
    /// Billed every year
    Annual,
}

impl BillingCycle {
    /// Stable string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// End of the billing period that starts at `from`
    pub fn period_end(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Monthly => from + Months::new(1),
            Self::Annual => from + Months::new(12),
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = BillingCycleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            _ => Err(BillingCycleParseError(s.to_string())),
        }
    }
}

/// Error parsing a billing cycle string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid billing cycle: {0}")]
pub struct BillingCycleParseError(pub String);

/// A user's subscription. Exactly one per user; never deleted, only
/// status-transitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// User who owns the subscription
    pub user_id: UserId,
    /// Current plan
    pub plan: Plan,
    /// Lifecycle status
    pub status: SubscriptionStatus,
    /// Billing cycle
    pub billing_cycle: BillingCycle,
    /// When the subscription started
    pub start_date: DateTime<Utc>,
    /// End of the paid period, if any
    pub end_date: Option<DateTime<Utc>>,
    /// Trial deadline, set while `status` is `Trial`
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// When the subscription was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// User-supplied cancellation reason
    pub cancel_reason: Option<String>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether a `Trial` subscription is past its deadline at `now`.
    ///
    /// Pure function of `now` vs `trial_ends_at`; the lifecycle manager runs
    /// it on every read so a stale `trial` status is never observable.
    pub fn trial_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Trial
            && self.trial_ends_at.is_some_and(|deadline| deadline <= now)
    }

    /// Whether the subscription grants access at `now`.
    ///
    /// Cancelled subscriptions keep access until `end_date` (soft-cancel);
    /// a cancelled subscription with no `end_date` has none.
    pub fn has_access_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trial => {
                self.trial_ends_at.is_some_and(|deadline| deadline > now)
            }
            SubscriptionStatus::Cancelled => self.end_date.is_some_and(|end| end > now),
            SubscriptionStatus::Expired => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: SubscriptionId::new(),
            user_id: UserId::new(),
            plan: Plan::Free,
            status,
            billing_cycle: BillingCycle::Monthly,
            start_date: Utc::now(),
            end_date: None,
            trial_ends_at: None,
            cancelled_at: None,
            cancel_reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_trial_expiry_is_deadline_comparison() {
        let now = Utc::now();
        let mut sub = sample(SubscriptionStatus::Trial);

        sub.trial_ends_at = Some(now + Duration::days(1));
        assert!(!sub.trial_expired_at(now));
        assert!(sub.has_access_at(now));

        sub.trial_ends_at = Some(now - Duration::seconds(1));
        assert!(sub.trial_expired_at(now));
        assert!(!sub.has_access_at(now));
    }

    #[test]
    fn test_soft_cancel_keeps_access_until_end_date() {
        let now = Utc::now();
        let mut sub = sample(SubscriptionStatus::Cancelled);

        sub.end_date = Some(now + Duration::days(10));
        assert!(sub.has_access_at(now));

        sub.end_date = Some(now - Duration::days(1));
        assert!(!sub.has_access_at(now));

        sub.end_date = None;
        assert!(!sub.has_access_at(now));
    }

    #[test]
    fn test_expired_never_has_access() {
        let sub = sample(SubscriptionStatus::Expired);
        assert!(!sub.has_access_at(Utc::now()));
    }

    #[test]
    fn test_billing_cycle_period_end() {
        let from = Utc::now();
        assert!(BillingCycle::Monthly.period_end(from) > from);
        assert!(BillingCycle::Annual.period_end(from) > BillingCycle::Monthly.period_end(from));
    }
}
