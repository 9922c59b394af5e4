//! Capability access handler

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use plaza_axum::CallerId;
use plaza_types::Feature;

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub feature: String,
    pub has_access: bool,
}

/// GET /api/v1/subscriptions/access/{feature}
///
/// The capability half of the entitlement check only; usage budgets are not
/// consulted.
pub async fn check_access(
    State(state): State<AppState>,
    caller: CallerId,
    Path(feature): Path<String>,
) -> ApiResult<Json<AccessResponse>> {
    let start = Instant::now();

    let feature: Feature = feature
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown feature: {feature}")))?;

    let has_access = state.guard.has_capability(caller.0, feature).await?;

    record_op_duration("check_access", start, true);

    Ok(Json(AccessResponse {
        feature: feature.to_string(),
        has_access,
    }))
}
