//! Cross-service scenarios for the subscription lifecycle
//!
//! These tests exercise the billing services together over one shared
//! in-memory store, the way the API process wires them.

use std::sync::Arc;

use mesa_shared::{PaymentStatus, SubscriptionStatus};
use time::{Duration, OffsetDateTime};

use crate::period::add_one_month;
use crate::store::{MemoryStore, NewTier, TenantSeed, TenantStore, TierStore};
use crate::{BillingService, NewPayment, VerifyDecision, VerifyRequest};

struct World {
    store: Arc<MemoryStore>,
    billing: BillingService,
}

fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let billing = BillingService::with_stores(store.clone(), store.clone(), store.clone());
    World { store, billing }
}

async fn seed_standard_tiers(store: &MemoryStore) {
    for (name, min, max, price) in [
        ("starter", 0, Some(99), 1000_i64),
        ("growth", 100, Some(199), 2500),
        ("enterprise", 200, None, 5000),
    ] {
        TierStore::create(
            store,
            NewTier {
                name: name.to_string(),
                min_users: min,
                max_users: max,
                price_cents: price,
                description: String::new(),
            },
        )
        .await
        .unwrap();
    }
}

fn verify_request(status: VerifyDecision) -> VerifyRequest {
    VerifyRequest {
        status,
        notes: None,
        period_start: None,
        period_end: None,
    }
}

/// The full happy path: fee quote, self-report, verification, gate.
#[tokio::test]
async fn subscription_lifecycle_end_to_end() {
    let w = world();
    seed_standard_tiers(&w.store).await;
    let tenant = w.store.seed_tenant(TenantSeed {
        users: 150,
        ..TenantSeed::default()
    });

    // A 150-user tenant is quoted the growth tier.
    let (fee, tier) = w.billing.tiers.calculate_monthly_fee(150).await.unwrap();
    assert_eq!(fee, 2500);
    assert_eq!(tier.name, "growth");

    // Self-reported payment lands pending, gate still closed.
    let payment = w
        .billing
        .payments
        .record_payment(
            tenant.id,
            NewPayment {
                amount_cents: 2500,
                payment_method: "bank_transfer".to_string(),
                transaction_id: "tx-e2e".to_string(),
                notes: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(!w.billing.subscriptions.check_access(tenant.id).await.unwrap());

    // Verification with no explicit period: active for one calendar month,
    // growth tier attached, gate open.
    let before = OffsetDateTime::now_utc();
    let outcome = w
        .billing
        .payments
        .verify_payment(payment.id, 1, verify_request(VerifyDecision::Verified))
        .await
        .unwrap();

    assert_eq!(outcome.tenant.subscription_status, SubscriptionStatus::Active);
    assert_eq!(outcome.tenant.subscription_tier_id, Some(tier.id));
    let expires = outcome.tenant.subscription_expires_at.unwrap();
    assert!((expires - add_one_month(before)).abs() < Duration::seconds(5));

    assert!(w.billing.subscriptions.check_access(tenant.id).await.unwrap());

    // The subscription page reflects the same state.
    let info = w
        .billing
        .subscriptions
        .subscription_info(tenant.id)
        .await
        .unwrap();
    assert_eq!(info.monthly_fee_cents, 2500);
    assert_eq!(info.current_tier.map(|t| t.id), Some(tier.id));
    assert!(info.recommended_tier.is_none());
    assert_eq!(info.latest_payment.map(|p| p.id), Some(payment.id));
}

/// Verification races the sweep: a verified payment re-opens the gate even
/// if a sweep pass ran in between.
#[tokio::test]
async fn verification_after_sweep_reactivates() {
    let w = world();
    seed_standard_tiers(&w.store).await;
    let tenant = w.store.seed_tenant(TenantSeed {
        users: 50,
        subscription_status: SubscriptionStatus::Active,
        subscription_expires_at: Some(OffsetDateTime::now_utc() - Duration::days(1)),
        is_access_restricted: false,
        ..TenantSeed::default()
    });

    let payment = w
        .billing
        .payments
        .record_payment(
            tenant.id,
            NewPayment {
                amount_cents: 1000,
                payment_method: "cash".to_string(),
                transaction_id: String::new(),
                notes: String::new(),
            },
        )
        .await
        .unwrap();

    // The sweep closes the gate first.
    assert_eq!(w.billing.subscriptions.expire_subscriptions().await.unwrap(), 1);
    assert!(!w.billing.subscriptions.check_access(tenant.id).await.unwrap());

    // Verification wins: expiry moves into the future, gate re-opens, and
    // the tenant is no longer eligible for the next sweep.
    w.billing
        .payments
        .verify_payment(payment.id, 1, verify_request(VerifyDecision::Verified))
        .await
        .unwrap();
    assert!(w.billing.subscriptions.check_access(tenant.id).await.unwrap());
    assert_eq!(w.billing.subscriptions.expire_subscriptions().await.unwrap(), 0);
}

/// A rejected payment never opens the gate, and the record cannot be
/// re-verified afterwards.
#[tokio::test]
async fn rejected_payment_keeps_gate_closed() {
    let w = world();
    let tenant = w.store.seed_tenant(TenantSeed::default());

    let payment = w
        .billing
        .payments
        .record_payment(
            tenant.id,
            NewPayment {
                amount_cents: 999,
                payment_method: "cash".to_string(),
                transaction_id: String::new(),
                notes: String::new(),
            },
        )
        .await
        .unwrap();

    w.billing
        .payments
        .verify_payment(payment.id, 1, verify_request(VerifyDecision::Rejected))
        .await
        .unwrap();

    assert!(!w.billing.subscriptions.check_access(tenant.id).await.unwrap());
    assert!(w
        .billing
        .payments
        .verify_payment(payment.id, 1, verify_request(VerifyDecision::Verified))
        .await
        .is_err());
    assert!(!w.billing.subscriptions.check_access(tenant.id).await.unwrap());
}

/// Repeated cycles: active -> expired (sweep) -> active (new payment).
#[tokio::test]
async fn tenant_state_machine_cycles() {
    let w = world();
    seed_standard_tiers(&w.store).await;
    let tenant = w.store.seed_tenant(TenantSeed {
        users: 10,
        ..TenantSeed::default()
    });

    for cycle in 0..3 {
        let payment = w
            .billing
            .payments
            .record_payment(
                tenant.id,
                NewPayment {
                    amount_cents: 1000,
                    payment_method: "cash".to_string(),
                    transaction_id: format!("tx-{cycle}"),
                    notes: String::new(),
                },
            )
            .await
            .unwrap();
        w.billing
            .payments
            .verify_payment(payment.id, 1, verify_request(VerifyDecision::Verified))
            .await
            .unwrap();
        assert!(w.billing.subscriptions.check_access(tenant.id).await.unwrap());

        // Force the period into the past and sweep.
        let current = TenantStore::get(&*w.store, tenant.id).await.unwrap();
        w.store
            .update_subscription_status(
                tenant.id,
                current.subscription_tier_id,
                SubscriptionStatus::Active,
                Some(OffsetDateTime::now_utc() - Duration::seconds(1)),
                false,
            )
            .await
            .unwrap();
        assert_eq!(w.billing.subscriptions.expire_subscriptions().await.unwrap(), 1);
        assert!(!w.billing.subscriptions.check_access(tenant.id).await.unwrap());
    }

    // Every cycle's payment is in the ledger, newest verification last.
    let all = w.billing.payments.payments_for_tenant(tenant.id).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|p| p.status == PaymentStatus::Verified));
}
