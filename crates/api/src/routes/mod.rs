//! Route table

pub mod payments;
pub mod tiers;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::auth::{require_auth, require_superadmin};
use crate::state::AppState;
use crate::subscription::subscription_gate;

/// Builds the full application router. Layer order on protected routes is
/// auth first, then the subscription gate, so the gate always sees an
/// `AuthUser` extension.
pub fn create_router(state: AppState) -> Router {
    let superadmin_routes = Router::new()
        .route("/api/superadmin/payments", get(payments::all_payments))
        .route(
            "/api/superadmin/payments/pending",
            get(payments::pending_payments),
        )
        .route(
            "/api/superadmin/payments/{id}",
            get(payments::payment_by_id),
        )
        .route(
            "/api/superadmin/payments/{id}/verify",
            post(payments::verify_payment),
        )
        .route(
            "/api/superadmin/payments/admin/{id}",
            get(payments::tenant_payments),
        )
        .route(
            "/api/superadmin/payments/admin/{id}/subscription",
            get(payments::tenant_subscription),
        )
        .route(
            "/api/superadmin/subscription-tiers",
            post(tiers::create_tier),
        )
        .route(
            "/api/superadmin/subscription-tiers/{id}",
            put(tiers::update_tier).delete(tiers::delete_tier),
        )
        .layer(from_fn(require_superadmin));

    let protected_routes = Router::new()
        .route(
            "/api/payments",
            post(payments::record_payment).get(payments::my_payments),
        )
        .route("/api/payments/subscription", get(payments::my_subscription))
        .route("/api/subscription-tiers", get(tiers::list_tiers))
        .route("/api/subscription-tiers/fee", get(tiers::monthly_fee))
        .merge(superadmin_routes)
        .layer(from_fn_with_state(state.clone(), subscription_gate))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/api/public/health", get(health))
        // Pricing is public so prospective tenants can compare tiers
        // before signing up.
        .route("/api/public/subscription-tiers", get(tiers::list_tiers))
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "success", "service": "mesa-api" }))
}
