//! Authentication middleware for Axum

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

use super::jwt::ROLE_SUPERADMIN;

/// Authenticated caller extracted from the bearer JWT, inserted as a request
/// extension by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub tenant_id: i64,
    pub role: String,
}

impl AuthUser {
    pub fn is_superadmin(&self) -> bool {
        self.role == ROLE_SUPERADMIN
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Validates the bearer JWT and attaches an [`AuthUser`] extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError::Unauthorized)?;
    let claims = state
        .jwt_manager
        .validate(token)
        .map_err(|_| ApiError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        tenant_id: claims.sub,
        role: claims.role,
    });
    Ok(next.run(request).await)
}

/// Restricts a route tree to platform operators. Must run after
/// [`require_auth`].
pub async fn require_superadmin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_superadmin() => Ok(next.run(request).await),
        Some(_) => Err(ApiError::Forbidden),
        None => Err(ApiError::Unauthorized),
    }
}
