//! Usage map handler

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use plaza_axum::CallerId;
use plaza_types::{FeatureUsage, Period};

use crate::error::ApiResult;
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub period: Period,
    pub usage: Vec<FeatureUsage>,
}

/// GET /api/v1/subscriptions/usage
///
/// Per-feature `{used, limit, percentage}`; the percentage is omitted for
/// unlimited features.
pub async fn get_usage(
    State(state): State<AppState>,
    caller: CallerId,
) -> ApiResult<Json<UsageResponse>> {
    let start = Instant::now();
    let period = Period::current();

    let sub = state.lifecycle.get(caller.0).await?;
    let usage = state
        .lifecycle
        .meter()
        .usage_for_period(caller.0, sub.plan, &period)
        .await?;

    record_op_duration("get_usage", start, true);

    Ok(Json(UsageResponse { period, usage }))
}
