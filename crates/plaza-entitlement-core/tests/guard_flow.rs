//! Guard-level integration tests over in-memory repositories
//!
//! Exercises the three-step check order (subscription status, capability,
//! usage budget) and the denial reason codes.

mod common;

use chrono::{Duration, Utc};

use common::{addon_row, engine, subscription_row};
use plaza_types::{Decision, Feature, Limit, Period, Plan, UserId};

#[tokio::test]
async fn test_check_auto_creates_default_subscription() {
    let env = engine();
    let user = UserId::new();

    let decision = env.guard.check(user, Feature::Services).await.unwrap();
    assert_eq!(decision, Decision::Allowed);

    // A free/active subscription now exists for the user
    let sub = env.lifecycle.get(user).await.unwrap();
    assert_eq!(sub.plan, Plan::Free);
    assert_eq!(env.subs.count(), 1);
}

#[tokio::test]
async fn test_check_strict_denies_without_subscription() {
    let env = engine();
    let user = UserId::new();

    let decision = env
        .guard
        .check_strict(user, Feature::Services)
        .await
        .unwrap();
    assert_eq!(decision, Decision::DeniedNoSubscription);

    // Strict checks must not create rows
    assert_eq!(env.subs.count(), 0);
}

#[tokio::test]
async fn test_capability_missing_from_plan() {
    let env = engine();
    let user = UserId::new();

    let decision = env.guard.check(user, Feature::Analytics).await.unwrap();
    assert_eq!(decision, Decision::DeniedPlanLacksCapability);
}

#[tokio::test]
async fn test_active_addon_widens_capability_set() {
    let env = engine();
    let user = UserId::new();

    env.add_ons.insert(addon_row(user.0, "analytics", "active"));
    let decision = env.guard.check(user, Feature::Analytics).await.unwrap();
    assert_eq!(decision, Decision::Allowed);
}

#[tokio::test]
async fn test_cancelled_addon_grants_nothing() {
    let env = engine();
    let user = UserId::new();

    env.add_ons.insert(addon_row(user.0, "analytics", "cancelled"));
    let decision = env.guard.check(user, Feature::Analytics).await.unwrap();
    assert_eq!(decision, Decision::DeniedPlanLacksCapability);
}

#[tokio::test]
async fn test_usage_exhaustion_then_upgrade_scenario() {
    // Free plan allows 3 services; after 3 commits the check denies, and an
    // upgrade to Professional (limit 10) re-allows with `used` carried
    // forward rather than reset.
    let env = engine();
    let user = UserId::new();
    let period = Period::current();

    let sub = env.lifecycle.get(user).await.unwrap();
    for _ in 0..3 {
        env.lifecycle
            .meter()
            .commit(user, sub.plan, Feature::Services, 1, &period)
            .await
            .unwrap();
    }

    let decision = env.guard.check(user, Feature::Services).await.unwrap();
    assert_eq!(decision, Decision::DeniedUsageExceeded);

    env.lifecycle
        .upgrade(user, Plan::Professional, plaza_types::BillingCycle::Monthly)
        .await
        .unwrap();

    let decision = env.guard.check(user, Feature::Services).await.unwrap();
    assert_eq!(decision, Decision::Allowed);

    let reading = env
        .lifecycle
        .meter()
        .peek(user, Plan::Professional, Feature::Services, &period)
        .await
        .unwrap();
    assert_eq!(reading.used, 3);
    assert_eq!(reading.limit, Limit::Capped(10));
}

#[tokio::test]
async fn test_expired_trial_observed_on_next_read() {
    let env = engine();
    let user = UserId::new();

    let mut row = subscription_row(user.0, "professional", "trial");
    row.trial_ends_at = Some(Utc::now() - Duration::hours(1));
    env.subs.insert(row);

    let sub = env.lifecycle.get(user).await.unwrap();
    assert_eq!(sub.status, plaza_types::SubscriptionStatus::Expired);

    let decision = env.guard.check(user, Feature::Services).await.unwrap();
    assert_eq!(decision, Decision::DeniedSubscriptionInactive);
}

#[tokio::test]
async fn test_soft_cancel_keeps_access_until_end_date() {
    let env = engine();
    let user = UserId::new();

    let mut row = subscription_row(user.0, "professional", "cancelled");
    row.end_date = Some(Utc::now() + Duration::days(10));
    row.cancelled_at = Some(Utc::now());
    env.subs.insert(row);

    let decision = env.guard.check(user, Feature::Services).await.unwrap();
    assert_eq!(decision, Decision::Allowed);
}

#[tokio::test]
async fn test_cancelled_past_end_date_is_inactive() {
    let env = engine();
    let user = UserId::new();

    let mut row = subscription_row(user.0, "professional", "cancelled");
    row.end_date = Some(Utc::now() - Duration::days(1));
    row.cancelled_at = Some(Utc::now() - Duration::days(20));
    env.subs.insert(row);

    let decision = env.guard.check(user, Feature::Services).await.unwrap();
    assert_eq!(decision, Decision::DeniedSubscriptionInactive);
}

#[tokio::test]
async fn test_capability_only_feature_skips_metering() {
    let env = engine();
    let user = UserId::new();

    let decision = env.guard.check(user, Feature::Messaging).await.unwrap();
    assert_eq!(decision, Decision::Allowed);

    // No counter was created for an unmetered feature
    assert_eq!(env.usage.count(), 0);
}

#[tokio::test]
async fn test_unlimited_feature_always_allowed() {
    let env = engine();
    let user = UserId::new();
    let period = Period::current();

    env.lifecycle
        .upgrade(user, Plan::Elite, plaza_types::BillingCycle::Annual)
        .await
        .unwrap();

    for _ in 0..50 {
        env.lifecycle
            .meter()
            .commit(user, Plan::Elite, Feature::Services, 1, &period)
            .await
            .unwrap();
    }

    let decision = env.guard.check(user, Feature::Services).await.unwrap();
    assert_eq!(decision, Decision::Allowed);
}

#[tokio::test]
async fn test_require_plan_matrix() {
    let env = engine();

    let pro = UserId::new();
    let business = UserId::new();
    let elite = UserId::new();
    env.subs.insert(subscription_row(pro.0, "professional", "active"));
    env.subs.insert(subscription_row(business.0, "business", "active"));
    env.subs.insert(subscription_row(elite.0, "elite", "active"));

    assert_eq!(
        env.guard.require_plan(pro, Plan::Business).await.unwrap(),
        Decision::DeniedPlanLacksCapability
    );
    assert_eq!(
        env.guard.require_plan(business, Plan::Business).await.unwrap(),
        Decision::Allowed
    );
    assert_eq!(
        env.guard.require_plan(elite, Plan::Business).await.unwrap(),
        Decision::Allowed
    );
}

#[tokio::test]
async fn test_require_plan_on_inactive_subscription() {
    let env = engine();
    let user = UserId::new();

    let mut row = subscription_row(user.0, "elite", "trial");
    row.trial_ends_at = Some(Utc::now() - Duration::minutes(5));
    env.subs.insert(row);

    assert_eq!(
        env.guard.require_plan(user, Plan::Free).await.unwrap(),
        Decision::DeniedSubscriptionInactive
    );
}

#[tokio::test]
async fn test_has_capability_is_capability_half_only() {
    let env = engine();
    let user = UserId::new();
    let period = Period::current();

    // Exhaust the services budget; the capability half still reports access
    let sub = env.lifecycle.get(user).await.unwrap();
    for _ in 0..3 {
        env.lifecycle
            .meter()
            .commit(user, sub.plan, Feature::Services, 1, &period)
            .await
            .unwrap();
    }

    assert!(env.guard.has_capability(user, Feature::Services).await.unwrap());
    assert!(!env.guard.has_capability(user, Feature::Analytics).await.unwrap());
}
