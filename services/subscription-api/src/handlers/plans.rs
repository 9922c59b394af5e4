//! Plan catalog handler

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: String,
    pub name: String,
    pub monthly_price_cents: i64,
    pub commission_rate_bps: u32,
    /// Per-feature limits; `-1` means unlimited
    pub limits: BTreeMap<String, i64>,
    /// Capability flags, sorted
    pub features: Vec<String>,
}

/// GET /api/v1/subscriptions/plans
pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<PlanResponse>> {
    let plans = state
        .catalog
        .plans()
        .map(|def| {
            let limits = def
                .limits
                .iter()
                .map(|(feature, limit)| (feature.as_str().to_string(), limit.raw()))
                .collect();

            let mut features: Vec<String> = def
                .capabilities
                .iter()
                .map(|feature| feature.as_str().to_string())
                .collect();
            features.sort();

            PlanResponse {
                id: def.id.to_string(),
                name: def.display_name.clone(),
                monthly_price_cents: def.monthly_price_cents,
                commission_rate_bps: def.commission_rate_bps,
                limits,
                features,
            }
        })
        .collect();

    Json(plans)
}
