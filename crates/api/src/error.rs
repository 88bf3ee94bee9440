//! API error type and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mesa_billing::BillingError;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    /// Gate rejection for tenants whose subscription has lapsed. Carries a
    /// machine-readable code so clients can redirect to the payment flow.
    #[error("active subscription required")]
    SubscriptionRequired,

    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::TenantNotFound
            | BillingError::PaymentNotFound
            | BillingError::TierNotFound => ApiError::NotFound(err.to_string()),
            BillingError::PaymentAlreadyFinalized(_) => ApiError::Conflict(err.to_string()),
            BillingError::InvalidInput(msg) => ApiError::BadRequest(msg),
            BillingError::Database(e) => ApiError::Internal(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::SubscriptionRequired => StatusCode::PAYMENT_REQUIRED,
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        if matches!(self, ApiError::SubscriptionRequired) {
            body["code"] = json!("SUBSCRIPTION_REQUIRED");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_errors_map_to_http_kinds() {
        assert!(matches!(
            ApiError::from(BillingError::TenantNotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(BillingError::PaymentAlreadyFinalized(
                mesa_shared::PaymentStatus::Verified
            )),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(BillingError::InvalidInput("amount".into())),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn subscription_required_carries_machine_code() {
        let response = ApiError::SubscriptionRequired.into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
