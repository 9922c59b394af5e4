//! Subscription lifecycle handlers

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use plaza_axum::CallerId;
use plaza_types::{BillingCycle, Period, Plan, Subscription};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::{record_op_duration, validate_reason};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub user_id: String,
    pub plan: String,
    pub status: String,
    pub billing_cycle: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            user_id: sub.user_id.to_string(),
            plan: sub.plan.to_string(),
            status: sub.status.to_string(),
            billing_cycle: sub.billing_cycle.to_string(),
            start_date: sub.start_date.to_rfc3339(),
            end_date: sub.end_date.map(|d| d.to_rfc3339()),
            trial_ends_at: sub.trial_ends_at.map(|d| d.to_rfc3339()),
            cancelled_at: sub.cancelled_at.map(|d| d.to_rfc3339()),
            cancel_reason: sub.cancel_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsageEntry {
    pub used: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionResponse {
    #[serde(flatten)]
    pub subscription: SubscriptionResponse,
    pub usage: BTreeMap<String, UsageEntry>,
}

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub billing_cycle: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/subscriptions/current
pub async fn get_current(
    State(state): State<AppState>,
    caller: CallerId,
) -> ApiResult<Json<CurrentSubscriptionResponse>> {
    let start = Instant::now();

    let sub = state.lifecycle.get(caller.0).await?;
    let entries = state
        .lifecycle
        .meter()
        .usage_for_period(caller.0, sub.plan, &Period::current())
        .await?;

    let usage = entries
        .into_iter()
        .map(|entry| {
            (
                entry.feature.as_str().to_string(),
                UsageEntry {
                    used: entry.used,
                    limit: entry.limit.raw(),
                },
            )
        })
        .collect();

    record_op_duration("get_current", start, true);

    Ok(Json(CurrentSubscriptionResponse {
        subscription: SubscriptionResponse::from(&sub),
        usage,
    }))
}

/// POST /api/v1/subscriptions/upgrade/{plan}
pub async fn upgrade(
    State(state): State<AppState>,
    caller: CallerId,
    Path(plan): Path<String>,
    Json(req): Json<UpgradeRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();

    let plan: Plan = plan
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid plan: {plan}")))?;
    let cycle: BillingCycle = req.billing_cycle.parse().map_err(|_| {
        ApiError::BadRequest(format!("Invalid billing cycle: {}", req.billing_cycle))
    })?;

    let sub = state.lifecycle.upgrade(caller.0, plan, cycle).await?;

    metrics::counter!("subscription_upgrades_total", "plan" => plan.as_str()).increment(1);
    record_op_duration("upgrade", start, true);

    tracing::info!(user_id = %caller.0, plan = %plan, cycle = %cycle, "subscription upgraded");

    Ok(Json(SubscriptionResponse::from(&sub)))
}

/// PATCH /api/v1/subscriptions/cancel
pub async fn cancel(
    State(state): State<AppState>,
    caller: CallerId,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();

    if let Some(reason) = &req.reason {
        validate_reason(reason)?;
    }

    let sub = state.lifecycle.cancel(caller.0, req.reason.as_deref()).await?;

    metrics::counter!("subscription_cancellations_total").increment(1);
    record_op_duration("cancel", start, true);

    Ok(Json(SubscriptionResponse::from(&sub)))
}

/// POST /api/v1/subscriptions/trial/{plan}
pub async fn start_trial(
    State(state): State<AppState>,
    caller: CallerId,
    Path(plan): Path<String>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();

    let plan: Plan = plan
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid plan: {plan}")))?;

    let sub = state.lifecycle.start_trial(caller.0, plan).await?;

    metrics::counter!("subscription_trials_started_total", "plan" => plan.as_str()).increment(1);
    record_op_duration("start_trial", start, true);

    Ok(Json(SubscriptionResponse::from(&sub)))
}
