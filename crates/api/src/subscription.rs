//! Subscription gate middleware
//!
//! Denies authenticated requests from tenants whose access is restricted.
//! Reads the persisted restriction flag only; it never reconciles state, so
//! a lapsed tenant keeps passing until the sweeper or a status check flips
//! the flag.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Path prefixes the gate never blocks: auth endpoints, public reads, and
/// the payment routes a restricted tenant needs to pay and to see why they
/// are restricted.
const GATE_EXEMPT_PREFIXES: &[&str] = &["/api/auth/", "/api/public/", "/api/payments"];

pub async fn subscription_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    if GATE_EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        return Ok(next.run(request).await);
    }

    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(ApiError::Unauthorized)?;
    if user.is_superadmin() {
        return Ok(next.run(request).await);
    }

    if state
        .billing
        .subscriptions
        .check_access(user.tenant_id)
        .await?
    {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(tenant_id = %user.tenant_id, path = %path, "request blocked by subscription gate");
        Err(ApiError::SubscriptionRequired)
    }
}
