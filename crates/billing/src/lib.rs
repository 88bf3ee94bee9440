#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Mesa Billing Module
//!
//! The subscription core of the platform: tiered fee lookup, the
//! operator-verified payment ledger, the per-tenant subscription state
//! machine, the request-time access gate and the periodic expiration
//! sweeper.
//!
//! ## Features
//!
//! - **Tiers**: pricing brackets by tenant user-count range, CRUD + lookup
//! - **Payments**: self-reported records pending human review
//! - **Verification**: one-shot finalize that activates the tenant's
//!   subscription in the same transaction
//! - **Access Gate**: pure read of the persisted restriction flag
//! - **Sweeper**: cancellable periodic bulk expiration pass

pub mod error;
pub mod payments;
pub mod period;
pub mod store;
pub mod subscription;
pub mod sweeper;
pub mod tiers;

#[cfg(test)]
mod edge_case_tests;

pub use error::{BillingError, BillingResult};
pub use payments::{NewPayment, PaymentService, VerifyDecision, VerifyOutcome, VerifyRequest};
pub use store::{
    FinalizePayment, MemoryStore, NewTier, PaymentInsert, PaymentStore, PgStore,
    TenantActivation, TenantSeed, TenantStore, TierStore,
};
pub use subscription::{SubscriptionInfo, SubscriptionService};
pub use sweeper::{SubscriptionSweeper, SweeperHandle};
pub use tiers::TierService;

use std::sync::Arc;

use sqlx::PgPool;

/// Main billing service combining all subscription functionality.
#[derive(Clone)]
pub struct BillingService {
    pub tiers: TierService,
    pub payments: PaymentService,
    pub subscriptions: SubscriptionService,
}

impl BillingService {
    /// Billing service over the Postgres store.
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::with_stores(store.clone(), store.clone(), store)
    }

    /// Billing service over explicit store implementations. The api and
    /// billing test suites use this with [`MemoryStore`].
    pub fn with_stores(
        tenants: Arc<dyn TenantStore>,
        payments: Arc<dyn PaymentStore>,
        tiers: Arc<dyn TierStore>,
    ) -> Self {
        Self {
            tiers: TierService::new(tiers.clone()),
            payments: PaymentService::new(payments.clone(), tenants.clone(), tiers.clone()),
            subscriptions: SubscriptionService::new(tenants, payments, tiers),
        }
    }
}
