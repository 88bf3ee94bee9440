//! Subscription state and access control
//!
//! The per-tenant state machine is `(none | expired) -> active -> expired`,
//! cyclical via repeated payment verification. `is_access_restricted` is the
//! persisted gate flag; the sweeper and the lazy status check close the gap
//! between "expiry passed" and "flag set", so the access gate itself can
//! stay a pure read.

use std::sync::Arc;

use mesa_shared::{PaymentRecord, SubscriptionStatus, SubscriptionTier, Tenant};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::{BillingError, BillingResult};
use crate::store::{PaymentStore, TenantStore, TierStore};

/// Everything a tenant's subscription page needs.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionInfo {
    pub tenant: Tenant,
    /// Monthly fee in cents for the tenant's current user count; zero when
    /// no tier covers it.
    pub monthly_fee_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tier: Option<SubscriptionTier>,
    /// Tier the user count maps to today, when it differs from the current
    /// association.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_tier: Option<SubscriptionTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_payment: Option<PaymentRecord>,
}

/// Subscription state machine operations and the access gate.
#[derive(Clone)]
pub struct SubscriptionService {
    tenants: Arc<dyn TenantStore>,
    payments: Arc<dyn PaymentStore>,
    tiers: Arc<dyn TierStore>,
}

impl SubscriptionService {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        payments: Arc<dyn PaymentStore>,
        tiers: Arc<dyn TierStore>,
    ) -> Self {
        Self {
            tenants,
            payments,
            tiers,
        }
    }

    /// On-demand status check with lazy reconciliation.
    ///
    /// Backfills a missing tier association from the current user count
    /// (metadata only, status untouched) and expires an overdue active
    /// subscription inline, so a tenant who checks their own page sees
    /// correct state even between sweep ticks.
    pub async fn check_status(&self, tenant_id: i64) -> BillingResult<Tenant> {
        let (mut tenant, tier) = self.tenants.get_with_tier(tenant_id).await?;

        if tier.is_none() && tenant.subscription_tier_id.is_none() {
            if let Ok(found) = self.tiers.tier_for_user_count(tenant.users).await {
                tenant.subscription_tier_id = Some(found.id);
                self.tenants
                    .update_subscription_status(
                        tenant.id,
                        tenant.subscription_tier_id,
                        tenant.subscription_status,
                        tenant.subscription_expires_at,
                        tenant.is_access_restricted,
                    )
                    .await?;
                tracing::debug!(
                    tenant_id = tenant.id,
                    tier_id = found.id,
                    "Backfilled subscription tier association"
                );
            }
        }

        let now = OffsetDateTime::now_utc();
        if tenant.subscription_status == SubscriptionStatus::Active
            && tenant.subscription_expires_at.is_some_and(|at| at < now)
        {
            tenant.subscription_status = SubscriptionStatus::Expired;
            tenant.is_access_restricted = true;
            self.tenants
                .update_subscription_status(
                    tenant.id,
                    tenant.subscription_tier_id,
                    tenant.subscription_status,
                    tenant.subscription_expires_at,
                    tenant.is_access_restricted,
                )
                .await?;
            tracing::info!(tenant_id = tenant.id, "Subscription expired on status check");
        }

        Ok(tenant)
    }

    /// Full subscription view: runs the lazy status check, then assembles
    /// tenant, tiers, latest verified payment and the monthly fee.
    pub async fn subscription_info(&self, tenant_id: i64) -> BillingResult<SubscriptionInfo> {
        self.check_status(tenant_id).await?;

        let (tenant, current_tier) = self.tenants.get_with_tier(tenant_id).await?;
        let latest_payment = self.payments.latest_verified(tenant_id).await?;

        let (monthly_fee_cents, covering) =
            match self.tiers.tier_for_user_count(tenant.users).await {
                Ok(tier) => (tier.price_cents, Some(tier)),
                Err(BillingError::TierNotFound) => (0, None),
                Err(e) => return Err(e),
            };

        let recommended_tier = covering.filter(|found| {
            current_tier
                .as_ref()
                .is_none_or(|current| current.id != found.id)
        });

        Ok(SubscriptionInfo {
            tenant,
            monthly_fee_cents,
            current_tier,
            recommended_tier,
            latest_payment,
        })
    }

    /// The access gate: a pure read of the persisted restriction flag. No
    /// lazy reconciliation happens here by design; a lapsed tenant passes
    /// until the next sweep or status check flips the flag.
    pub async fn check_access(&self, tenant_id: i64) -> BillingResult<bool> {
        self.tenants.check_access(tenant_id).await
    }

    /// One bulk expiration pass. Returns the number of tenants transitioned.
    pub async fn expire_subscriptions(&self) -> BillingResult<u64> {
        self.tenants.expire_subscriptions().await
    }

    /// Active tenants whose subscription ends within `days` days.
    pub async fn expiring_within(&self, days: i64) -> BillingResult<Vec<Tenant>> {
        self.tenants.expiring_within(days).await
    }
}
