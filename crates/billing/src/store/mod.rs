//! Persistence contracts for the billing core
//!
//! Three narrow traits, one per table, plus the parameter structs their
//! operations take. `PgStore` implements all of them over a shared
//! connection pool; `MemoryStore` backs the test suite.

mod memory;
mod postgres;

pub use memory::{MemoryStore, TenantSeed};
pub use postgres::PgStore;

use async_trait::async_trait;
use mesa_shared::{PaymentRecord, PaymentStatus, SubscriptionStatus, SubscriptionTier, Tenant};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::BillingResult;

/// Fields for creating or replacing a subscription tier.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTier {
    pub name: String,
    pub min_users: i32,
    pub max_users: Option<i32>,
    pub price_cents: i64,
    #[serde(default)]
    pub description: String,
}

/// Store-level payment insert. Built by `PaymentService::record_payment`
/// after tenant and tier resolution; always lands in `Pending` state.
#[derive(Debug, Clone)]
pub struct PaymentInsert {
    pub tenant_id: i64,
    pub amount_cents: i64,
    pub payment_date: OffsetDateTime,
    pub payment_method: String,
    pub transaction_id: String,
    pub subscription_tier_id: Option<i64>,
    pub notes: String,
}

/// Tenant-row activation applied together with a verified payment.
#[derive(Debug, Clone)]
pub struct TenantActivation {
    pub tenant_id: i64,
    pub subscription_tier_id: Option<i64>,
    pub expires_at: OffsetDateTime,
}

/// One-shot finalization of a pending payment.
///
/// `status` is `Verified` or `Rejected`. When `activate` is set the tenant
/// row is updated in the same transaction as the payment row, so a crash
/// cannot leave a verified payment with an inactive tenant.
#[derive(Debug, Clone)]
pub struct FinalizePayment {
    pub payment_id: i64,
    pub operator_id: i64,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub period_start: Option<OffsetDateTime>,
    pub period_end: Option<OffsetDateTime>,
    pub activate: Option<TenantActivation>,
}

/// Tenant persistence contract.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get(&self, id: i64) -> BillingResult<Tenant>;

    /// Tenant plus its currently associated tier, if any.
    async fn get_with_tier(&self, id: i64)
        -> BillingResult<(Tenant, Option<SubscriptionTier>)>;

    /// Overwrite the subscription fields of one tenant.
    async fn update_subscription_status(
        &self,
        id: i64,
        tier_id: Option<i64>,
        status: SubscriptionStatus,
        expires_at: Option<OffsetDateTime>,
        is_restricted: bool,
    ) -> BillingResult<()>;

    /// Active tenants whose subscription ends within `days` days, soonest
    /// first.
    async fn expiring_within(&self, days: i64) -> BillingResult<Vec<Tenant>>;

    /// Bulk pass: every active tenant whose expiry is in the past becomes
    /// expired and restricted. Returns the number of tenants transitioned.
    async fn expire_subscriptions(&self) -> BillingResult<u64>;

    /// `NOT is_access_restricted`, read straight from the persisted row.
    async fn check_access(&self, id: i64) -> BillingResult<bool>;
}

/// Payment ledger persistence contract.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: PaymentInsert) -> BillingResult<PaymentRecord>;

    async fn get(&self, id: i64) -> BillingResult<PaymentRecord>;

    async fn list_for_tenant(&self, tenant_id: i64) -> BillingResult<Vec<PaymentRecord>>;

    async fn list_all(&self) -> BillingResult<Vec<PaymentRecord>>;

    async fn list_pending(&self) -> BillingResult<Vec<PaymentRecord>>;

    /// Most recent verified payment for a tenant, if any.
    async fn latest_verified(&self, tenant_id: i64) -> BillingResult<Option<PaymentRecord>>;

    /// Finalize a pending payment (and activate its tenant when requested)
    /// atomically. Fails with `PaymentAlreadyFinalized` if the record is no
    /// longer pending, also under concurrent finalization attempts.
    async fn finalize_payment(&self, apply: FinalizePayment) -> BillingResult<PaymentRecord>;
}

/// Tier table persistence contract.
#[async_trait]
pub trait TierStore: Send + Sync {
    async fn create(&self, tier: NewTier) -> BillingResult<SubscriptionTier>;

    async fn get(&self, id: i64) -> BillingResult<SubscriptionTier>;

    /// All tiers ordered by `min_users`.
    async fn list(&self) -> BillingResult<Vec<SubscriptionTier>>;

    async fn update(&self, id: i64, tier: NewTier) -> BillingResult<SubscriptionTier>;

    async fn delete(&self, id: i64) -> BillingResult<()>;

    /// Highest-priced tier whose range covers `user_count`; the price
    /// ordering is the tie-break for overlapping ranges.
    async fn tier_for_user_count(&self, user_count: i32) -> BillingResult<SubscriptionTier>;
}
