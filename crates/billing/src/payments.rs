//! Payment recording and verification
//!
//! Tenants self-report payments into a pending ledger; a super-admin
//! operator later verifies or rejects each record. Verification is the only
//! payment-side operation that touches tenant subscription state, and it is
//! deliberately separated from recording so every self-reported payment
//! passes a human review gate.

use std::sync::Arc;

use mesa_shared::{PaymentRecord, PaymentStatus, Tenant};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{BillingError, BillingResult};
use crate::period::add_one_month;
use crate::store::{
    FinalizePayment, PaymentInsert, PaymentStore, TenantActivation, TenantStore, TierStore,
};

/// A tenant's self-reported payment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub amount_cents: i64,
    pub payment_method: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub notes: String,
}

/// Operator decision on a pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyDecision {
    Verified,
    Rejected,
}

/// Operator verification request.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub status: VerifyDecision,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub period_start: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub period_end: Option<OffsetDateTime>,
}

/// Outcome of a verification, carrying both updated rows.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutcome {
    pub payment: PaymentRecord,
    pub tenant: Tenant,
}

/// Payment ledger operations.
#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    tenants: Arc<dyn TenantStore>,
    tiers: Arc<dyn TierStore>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        tenants: Arc<dyn TenantStore>,
        tiers: Arc<dyn TierStore>,
    ) -> Self {
        Self {
            payments,
            tenants,
            tiers,
        }
    }

    /// Record a self-reported payment for a tenant.
    ///
    /// The record lands in `Pending` state and does not touch the tenant's
    /// subscription; tier association is best-effort from the tenant's
    /// current user count.
    pub async fn record_payment(
        &self,
        tenant_id: i64,
        payment: NewPayment,
    ) -> BillingResult<PaymentRecord> {
        if payment.amount_cents <= 0 {
            return Err(BillingError::InvalidInput(
                "payment amount must be positive".to_string(),
            ));
        }
        if payment.payment_method.trim().is_empty() {
            return Err(BillingError::InvalidInput(
                "payment method is required".to_string(),
            ));
        }

        let tenant = self.tenants.get(tenant_id).await?;

        // No covering tier is fine: the payment just carries no association.
        let tier_id = match self.tiers.tier_for_user_count(tenant.users).await {
            Ok(tier) => Some(tier.id),
            Err(BillingError::TierNotFound) => None,
            Err(e) => return Err(e),
        };

        let record = self
            .payments
            .create(PaymentInsert {
                tenant_id,
                amount_cents: payment.amount_cents,
                payment_date: OffsetDateTime::now_utc(),
                payment_method: payment.payment_method,
                transaction_id: payment.transaction_id,
                subscription_tier_id: tier_id,
                notes: payment.notes,
            })
            .await?;

        tracing::info!(
            payment_id = record.id,
            tenant_id = tenant_id,
            amount_cents = record.amount_cents,
            "Recorded pending payment"
        );

        Ok(record)
    }

    pub async fn get_payment(&self, id: i64) -> BillingResult<PaymentRecord> {
        self.payments.get(id).await
    }

    /// All payments for one tenant, newest first. Fails with
    /// `TenantNotFound` for an unknown tenant.
    pub async fn payments_for_tenant(&self, tenant_id: i64) -> BillingResult<Vec<PaymentRecord>> {
        self.tenants.get(tenant_id).await?;
        self.payments.list_for_tenant(tenant_id).await
    }

    pub async fn all_payments(&self) -> BillingResult<Vec<PaymentRecord>> {
        self.payments.list_all().await
    }

    pub async fn pending_payments(&self) -> BillingResult<Vec<PaymentRecord>> {
        self.payments.list_pending().await
    }

    /// Finalize a pending payment.
    ///
    /// Verified: stamps the payment (verifier, timestamp, period bounds,
    /// defaulting `period_end` to one calendar month from now) and activates
    /// the owning tenant in the same store transaction. Rejected: only the
    /// payment row changes.
    ///
    /// A record that is no longer pending yields `PaymentAlreadyFinalized`;
    /// finalization is terminal.
    pub async fn verify_payment(
        &self,
        payment_id: i64,
        operator_id: i64,
        request: VerifyRequest,
    ) -> BillingResult<VerifyOutcome> {
        let payment = self.payments.get(payment_id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(BillingError::PaymentAlreadyFinalized(payment.status));
        }

        let tenant = self.tenants.get(payment.tenant_id).await?;

        let apply = match request.status {
            VerifyDecision::Verified => {
                let period_end = request
                    .period_end
                    .unwrap_or_else(|| add_one_month(OffsetDateTime::now_utc()));
                FinalizePayment {
                    payment_id,
                    operator_id,
                    status: PaymentStatus::Verified,
                    notes: request.notes,
                    period_start: request.period_start,
                    period_end: Some(period_end),
                    activate: Some(TenantActivation {
                        tenant_id: tenant.id,
                        subscription_tier_id: payment.subscription_tier_id,
                        expires_at: period_end,
                    }),
                }
            }
            VerifyDecision::Rejected => FinalizePayment {
                payment_id,
                operator_id,
                status: PaymentStatus::Rejected,
                notes: request.notes,
                period_start: None,
                period_end: None,
                activate: None,
            },
        };

        let decision = apply.status;
        let payment = self.payments.finalize_payment(apply).await?;
        let tenant = self.tenants.get(payment.tenant_id).await?;

        tracing::info!(
            payment_id = payment.id,
            tenant_id = tenant.id,
            operator_id = operator_id,
            decision = %decision,
            "Finalized payment"
        );

        Ok(VerifyOutcome { payment, tenant })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewTier, TenantSeed};
    use mesa_shared::SubscriptionStatus;
    use time::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PaymentService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = PaymentService::new(store.clone(), store.clone(), store.clone());
        Fixture { store, service }
    }

    async fn seed_growth_tier(store: &MemoryStore) -> i64 {
        TierStore::create(
            store,
            NewTier {
                name: "growth".to_string(),
                min_users: 100,
                max_users: Some(199),
                price_cents: 2500,
                description: String::new(),
            },
        )
        .await
        .unwrap()
        .id
    }

    fn payment() -> NewPayment {
        NewPayment {
            amount_cents: 2500,
            payment_method: "bank_transfer".to_string(),
            transaction_id: "tx-1".to_string(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn recorded_payment_is_pending_and_unverified() {
        let f = fixture();
        let tier_id = seed_growth_tier(&f.store).await;
        let tenant = f.store.seed_tenant(TenantSeed {
            users: 150,
            ..TenantSeed::default()
        });

        let record = f.service.record_payment(tenant.id, payment()).await.unwrap();

        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.verified_by, None);
        assert_eq!(record.verified_at, None);
        assert_eq!(record.subscription_tier_id, Some(tier_id));
    }

    #[tokio::test]
    async fn recording_without_covering_tier_keeps_no_association() {
        let f = fixture();
        let tenant = f.store.seed_tenant(TenantSeed::default());

        let record = f.service.record_payment(tenant.id, payment()).await.unwrap();
        assert_eq!(record.subscription_tier_id, None);
    }

    #[tokio::test]
    async fn recording_does_not_touch_tenant_subscription() {
        let f = fixture();
        let tenant = f.store.seed_tenant(TenantSeed::default());

        f.service.record_payment(tenant.id, payment()).await.unwrap();

        let after = TenantStore::get(&*f.store, tenant.id).await.unwrap();
        assert_eq!(after.subscription_status, SubscriptionStatus::None);
        assert!(after.is_access_restricted);
    }

    #[tokio::test]
    async fn recording_validates_input() {
        let f = fixture();
        let tenant = f.store.seed_tenant(TenantSeed::default());

        let err = f
            .service
            .record_payment(
                tenant.id,
                NewPayment {
                    amount_cents: 0,
                    ..payment()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));

        let err = f
            .service
            .record_payment(
                tenant.id,
                NewPayment {
                    payment_method: "  ".to_string(),
                    ..payment()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn recording_for_missing_tenant_fails() {
        let f = fixture();
        let err = f.service.record_payment(99, payment()).await.unwrap_err();
        assert!(matches!(err, BillingError::TenantNotFound));
    }

    #[tokio::test]
    async fn verification_activates_tenant_with_default_period() {
        let f = fixture();
        seed_growth_tier(&f.store).await;
        let tenant = f.store.seed_tenant(TenantSeed {
            users: 150,
            ..TenantSeed::default()
        });
        let record = f.service.record_payment(tenant.id, payment()).await.unwrap();

        let before = OffsetDateTime::now_utc();
        let outcome = f
            .service
            .verify_payment(
                record.id,
                7,
                VerifyRequest {
                    status: VerifyDecision::Verified,
                    notes: Some("confirmed".to_string()),
                    period_start: None,
                    period_end: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.payment.status, PaymentStatus::Verified);
        assert_eq!(outcome.payment.verified_by, Some(7));
        assert!(outcome.payment.verified_at.is_some());
        assert_eq!(outcome.payment.notes, "confirmed");

        assert_eq!(outcome.tenant.subscription_status, SubscriptionStatus::Active);
        assert!(!outcome.tenant.is_access_restricted);
        assert_eq!(
            outcome.tenant.subscription_tier_id,
            record.subscription_tier_id
        );

        // Defaulted expiry is one calendar month out.
        let expires = outcome.tenant.subscription_expires_at.unwrap();
        let expected = add_one_month(before);
        assert!((expires - expected).abs() < Duration::seconds(5));
        assert_eq!(outcome.payment.period_end, Some(expires));
    }

    #[tokio::test]
    async fn verification_honors_explicit_period_end() {
        let f = fixture();
        let tenant = f.store.seed_tenant(TenantSeed::default());
        let record = f.service.record_payment(tenant.id, payment()).await.unwrap();

        let end = OffsetDateTime::now_utc() + Duration::days(90);
        let outcome = f
            .service
            .verify_payment(
                record.id,
                7,
                VerifyRequest {
                    status: VerifyDecision::Verified,
                    notes: None,
                    period_start: Some(OffsetDateTime::now_utc()),
                    period_end: Some(end),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.tenant.subscription_expires_at, Some(end));
        assert_eq!(outcome.payment.period_end, Some(end));
        assert!(outcome.payment.period_start.is_some());
    }

    #[tokio::test]
    async fn rejection_leaves_tenant_untouched() {
        let f = fixture();
        let tenant = f.store.seed_tenant(TenantSeed {
            users: 10,
            ..TenantSeed::default()
        });
        let record = f.service.record_payment(tenant.id, payment()).await.unwrap();
        let before = TenantStore::get(&*f.store, tenant.id).await.unwrap();

        let outcome = f
            .service
            .verify_payment(
                record.id,
                7,
                VerifyRequest {
                    status: VerifyDecision::Rejected,
                    notes: Some("amount mismatch".to_string()),
                    period_start: None,
                    period_end: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.payment.status, PaymentStatus::Rejected);
        assert_eq!(outcome.payment.verified_by, Some(7));
        assert!(outcome.payment.verified_at.is_some());

        let after = TenantStore::get(&*f.store, tenant.id).await.unwrap();
        assert_eq!(after.subscription_status, before.subscription_status);
        assert_eq!(after.subscription_tier_id, before.subscription_tier_id);
        assert_eq!(after.subscription_expires_at, before.subscription_expires_at);
        assert_eq!(after.is_access_restricted, before.is_access_restricted);
    }

    #[tokio::test]
    async fn second_finalization_conflicts() {
        let f = fixture();
        let tenant = f.store.seed_tenant(TenantSeed::default());
        let record = f.service.record_payment(tenant.id, payment()).await.unwrap();

        let verify = VerifyRequest {
            status: VerifyDecision::Verified,
            notes: None,
            period_start: None,
            period_end: None,
        };
        f.service
            .verify_payment(record.id, 7, verify.clone())
            .await
            .unwrap();

        let err = f
            .service
            .verify_payment(record.id, 7, verify)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BillingError::PaymentAlreadyFinalized(PaymentStatus::Verified)
        ));
    }

    #[tokio::test]
    async fn verify_after_reject_conflicts() {
        let f = fixture();
        let tenant = f.store.seed_tenant(TenantSeed::default());
        let record = f.service.record_payment(tenant.id, payment()).await.unwrap();

        f.service
            .verify_payment(
                record.id,
                7,
                VerifyRequest {
                    status: VerifyDecision::Rejected,
                    notes: None,
                    period_start: None,
                    period_end: None,
                },
            )
            .await
            .unwrap();

        let err = f
            .service
            .verify_payment(
                record.id,
                7,
                VerifyRequest {
                    status: VerifyDecision::Verified,
                    notes: None,
                    period_start: None,
                    period_end: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BillingError::PaymentAlreadyFinalized(PaymentStatus::Rejected)
        ));

        // The losing attempt changed nothing.
        let after = TenantStore::get(&*f.store, tenant.id).await.unwrap();
        assert_eq!(after.subscription_status, SubscriptionStatus::None);
    }

    #[tokio::test]
    async fn verifying_missing_payment_fails() {
        let f = fixture();
        let err = f
            .service
            .verify_payment(
                404,
                7,
                VerifyRequest {
                    status: VerifyDecision::Verified,
                    notes: None,
                    period_start: None,
                    period_end: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PaymentNotFound));
    }
}
