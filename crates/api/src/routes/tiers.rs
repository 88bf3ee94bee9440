//! Subscription tier handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mesa_billing::{BillingError, NewTier};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeeQuery {
    pub users: i32,
}

/// GET /api/subscription-tiers — the tier table.
pub async fn list_tiers(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let tiers = state.billing.tiers.list_tiers().await?;
    Ok(Json(json!({ "status": "success", "tiers": tiers })))
}

/// GET /api/subscription-tiers/fee?users=N — fee quote for a user count.
/// A count no tier covers quotes zero rather than erroring.
pub async fn monthly_fee(
    State(state): State<AppState>,
    Query(query): Query<FeeQuery>,
) -> ApiResult<Json<Value>> {
    match state.billing.tiers.calculate_monthly_fee(query.users).await {
        Ok((fee, tier)) => Ok(Json(json!({
            "status": "success",
            "monthly_fee": fee,
            "tier": tier,
        }))),
        Err(BillingError::TierNotFound) => {
            Ok(Json(json!({ "status": "success", "monthly_fee": 0 })))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /api/superadmin/subscription-tiers
pub async fn create_tier(
    State(state): State<AppState>,
    Json(body): Json<NewTier>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let tier = state.billing.tiers.create_tier(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "tier": tier })),
    ))
}

/// PUT /api/superadmin/subscription-tiers/{id}
pub async fn update_tier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewTier>,
) -> ApiResult<Json<Value>> {
    let tier = state.billing.tiers.update_tier(id, body).await?;
    Ok(Json(json!({ "status": "success", "tier": tier })))
}

/// DELETE /api/superadmin/subscription-tiers/{id}
pub async fn delete_tier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.billing.tiers.delete_tier(id).await?;
    Ok(Json(json!({ "status": "success", "message": "tier deleted" })))
}
