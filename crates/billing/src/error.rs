//! Billing error types

use mesa_shared::PaymentStatus;
use thiserror::Error;

/// Errors surfaced by the billing core.
///
/// Store implementations translate their own "row not found" conditions into
/// the domain `*NotFound` variants at the boundary; raw storage errors only
/// reach callers wrapped in `Database`.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("tenant not found")]
    TenantNotFound,

    #[error("payment not found")]
    PaymentNotFound,

    #[error("no subscription tier covers this user count")]
    TierNotFound,

    /// A pending payment can be finalized exactly once.
    #[error("payment already finalized as {0}")]
    PaymentAlreadyFinalized(PaymentStatus),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BillingError {
    /// Whether this error means a referenced entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BillingError::TenantNotFound
                | BillingError::PaymentNotFound
                | BillingError::TierNotFound
        )
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
