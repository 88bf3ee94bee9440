//! Payment and subscription-status handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use mesa_billing::{NewPayment, SubscriptionInfo, VerifyRequest};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/payments — tenant self-reports a payment for operator review.
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewPayment>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let payment = state
        .billing
        .payments
        .record_payment(user.tenant_id, body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "payment recorded and pending review",
            "payment": payment,
        })),
    ))
}

/// GET /api/payments — the calling tenant's payment history.
pub async fn my_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let payments = state
        .billing
        .payments
        .payments_for_tenant(user.tenant_id)
        .await?;
    Ok(Json(json!({ "status": "success", "payments": payments })))
}

/// GET /api/payments/subscription — the calling tenant's subscription state,
/// reconciled before reading.
pub async fn my_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let info = state
        .billing
        .subscriptions
        .subscription_info(user.tenant_id)
        .await?;
    Ok(Json(subscription_body(info)))
}

/// GET /api/superadmin/payments — every payment on the platform.
pub async fn all_payments(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let payments = state.billing.payments.all_payments().await?;
    Ok(Json(json!({ "status": "success", "payments": payments })))
}

/// GET /api/superadmin/payments/{id} — one payment record.
pub async fn payment_by_id(
    State(state): State<AppState>,
    Path(payment_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let payment = state.billing.payments.get_payment(payment_id).await?;
    Ok(Json(json!({ "status": "success", "payment": payment })))
}

/// GET /api/superadmin/payments/pending — payments awaiting review.
pub async fn pending_payments(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let payments = state.billing.payments.pending_payments().await?;
    Ok(Json(json!({ "status": "success", "payments": payments })))
}

/// GET /api/superadmin/payments/admin/{id} — one tenant's payment history.
pub async fn tenant_payments(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let payments = state.billing.payments.payments_for_tenant(tenant_id).await?;
    Ok(Json(json!({ "status": "success", "payments": payments })))
}

/// GET /api/superadmin/payments/admin/{id}/subscription — any tenant's
/// subscription state.
pub async fn tenant_subscription(
    State(state): State<AppState>,
    Path(tenant_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let info = state.billing.subscriptions.subscription_info(tenant_id).await?;
    Ok(Json(subscription_body(info)))
}

/// POST /api/superadmin/payments/{id}/verify — operator verdict on a
/// pending payment.
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(payment_id): Path<i64>,
    Json(body): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .billing
        .payments
        .verify_payment(payment_id, user.tenant_id, body)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "payment reviewed",
        "payment": outcome.payment,
        "admin": outcome.tenant,
    })))
}

fn subscription_body(info: SubscriptionInfo) -> Value {
    let mut body = json!({
        "status": "success",
        "monthly_fee": info.monthly_fee_cents,
        "subscription_status": info.tenant.subscription_status,
        "is_access_restricted": info.tenant.is_access_restricted,
        "admin": info.tenant,
    });
    if let Some(tier) = info.current_tier {
        body["current_tier"] = json!(tier);
    }
    if let Some(tier) = info.recommended_tier {
        body["recommended_tier"] = json!(tier);
    }
    if let Some(payment) = info.latest_payment {
        body["latest_payment"] = json!(payment);
    }
    body
}
