//! In-memory store
//!
//! Backs the test suites of the billing and api crates. All three traits
//! are served from one mutex-guarded map set, so multi-row operations hold
//! the lock for their whole duration and behave like small transactions.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use mesa_shared::{PaymentRecord, PaymentStatus, SubscriptionStatus, SubscriptionTier, Tenant};
use time::{Duration, OffsetDateTime};

use crate::error::{BillingError, BillingResult};
use crate::store::{
    FinalizePayment, NewTier, PaymentInsert, PaymentStore, TenantStore, TierStore,
};

#[derive(Default)]
struct Inner {
    tenants: BTreeMap<i64, Tenant>,
    payments: BTreeMap<i64, PaymentRecord>,
    tiers: BTreeMap<i64, SubscriptionTier>,
    next_tenant_id: i64,
    next_payment_id: i64,
    next_tier_id: i64,
}

/// Seed data for inserting a tenant directly, bypassing the service layer.
#[derive(Debug, Clone)]
pub struct TenantSeed {
    pub user_name: String,
    pub email: String,
    pub company_name: String,
    pub users: i32,
    pub subscription_tier_id: Option<i64>,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<OffsetDateTime>,
    pub is_access_restricted: bool,
}

impl Default for TenantSeed {
    fn default() -> Self {
        Self {
            user_name: "tenant".to_string(),
            email: "tenant@example.com".to_string(),
            company_name: "Test Co".to_string(),
            users: 0,
            subscription_tier_id: None,
            subscription_status: SubscriptionStatus::None,
            subscription_expires_at: None,
            is_access_restricted: true,
        }
    }
}

/// In-memory implementation of all three store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a tenant with explicit subscription state. Returns the stored
    /// row with its assigned id.
    pub fn seed_tenant(&self, seed: TenantSeed) -> Tenant {
        let mut inner = self.lock();
        inner.next_tenant_id += 1;
        let now = OffsetDateTime::now_utc();
        let tenant = Tenant {
            id: inner.next_tenant_id,
            user_name: seed.user_name,
            email: seed.email,
            company_name: seed.company_name,
            users: seed.users,
            subscription_tier_id: seed.subscription_tier_id,
            subscription_status: seed.subscription_status,
            subscription_expires_at: seed.subscription_expires_at,
            is_access_restricted: seed.is_access_restricted,
            created_at: now,
            updated_at: now,
        };
        inner.tenants.insert(tenant.id, tenant.clone());
        tenant
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn get(&self, id: i64) -> BillingResult<Tenant> {
        self.lock()
            .tenants
            .get(&id)
            .cloned()
            .ok_or(BillingError::TenantNotFound)
    }

    async fn get_with_tier(
        &self,
        id: i64,
    ) -> BillingResult<(Tenant, Option<SubscriptionTier>)> {
        let inner = self.lock();
        let tenant = inner
            .tenants
            .get(&id)
            .cloned()
            .ok_or(BillingError::TenantNotFound)?;
        let tier = tenant
            .subscription_tier_id
            .and_then(|tier_id| inner.tiers.get(&tier_id).cloned());
        Ok((tenant, tier))
    }

    async fn update_subscription_status(
        &self,
        id: i64,
        tier_id: Option<i64>,
        status: SubscriptionStatus,
        expires_at: Option<OffsetDateTime>,
        is_restricted: bool,
    ) -> BillingResult<()> {
        let mut inner = self.lock();
        let tenant = inner
            .tenants
            .get_mut(&id)
            .ok_or(BillingError::TenantNotFound)?;
        tenant.subscription_tier_id = tier_id;
        tenant.subscription_status = status;
        tenant.subscription_expires_at = expires_at;
        tenant.is_access_restricted = is_restricted;
        tenant.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn expiring_within(&self, days: i64) -> BillingResult<Vec<Tenant>> {
        let cutoff = OffsetDateTime::now_utc() + Duration::days(days);
        let mut tenants: Vec<Tenant> = self
            .lock()
            .tenants
            .values()
            .filter(|t| {
                t.subscription_status == SubscriptionStatus::Active
                    && t.subscription_expires_at.is_some_and(|at| at <= cutoff)
            })
            .cloned()
            .collect();
        tenants.sort_by_key(|t| t.subscription_expires_at);
        Ok(tenants)
    }

    async fn expire_subscriptions(&self) -> BillingResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut count = 0;
        for tenant in self.lock().tenants.values_mut() {
            if tenant.subscription_status == SubscriptionStatus::Active
                && tenant.subscription_expires_at.is_some_and(|at| at < now)
            {
                tenant.subscription_status = SubscriptionStatus::Expired;
                tenant.is_access_restricted = true;
                tenant.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn check_access(&self, id: i64) -> BillingResult<bool> {
        self.lock()
            .tenants
            .get(&id)
            .map(|t| !t.is_access_restricted)
            .ok_or(BillingError::TenantNotFound)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn create(&self, payment: PaymentInsert) -> BillingResult<PaymentRecord> {
        let mut inner = self.lock();
        if !inner.tenants.contains_key(&payment.tenant_id) {
            return Err(BillingError::TenantNotFound);
        }
        inner.next_payment_id += 1;
        let now = OffsetDateTime::now_utc();
        let record = PaymentRecord {
            id: inner.next_payment_id,
            tenant_id: payment.tenant_id,
            amount_cents: payment.amount_cents,
            payment_date: payment.payment_date,
            payment_method: payment.payment_method,
            transaction_id: payment.transaction_id,
            subscription_tier_id: payment.subscription_tier_id,
            period_start: None,
            period_end: None,
            status: PaymentStatus::Pending,
            notes: payment.notes,
            verified_by: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.payments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> BillingResult<PaymentRecord> {
        self.lock()
            .payments
            .get(&id)
            .cloned()
            .ok_or(BillingError::PaymentNotFound)
    }

    async fn list_for_tenant(&self, tenant_id: i64) -> BillingResult<Vec<PaymentRecord>> {
        let mut records: Vec<PaymentRecord> = self
            .lock()
            .payments
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(records)
    }

    async fn list_all(&self) -> BillingResult<Vec<PaymentRecord>> {
        let mut records: Vec<PaymentRecord> = self.lock().payments.values().cloned().collect();
        records.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(records)
    }

    async fn list_pending(&self) -> BillingResult<Vec<PaymentRecord>> {
        let mut records: Vec<PaymentRecord> = self
            .lock()
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Pending)
            .cloned()
            .collect();
        records.sort_by_key(|p| p.payment_date);
        Ok(records)
    }

    async fn latest_verified(&self, tenant_id: i64) -> BillingResult<Option<PaymentRecord>> {
        Ok(self
            .lock()
            .payments
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.status == PaymentStatus::Verified)
            .max_by_key(|p| p.verified_at)
            .cloned())
    }

    async fn finalize_payment(&self, apply: FinalizePayment) -> BillingResult<PaymentRecord> {
        let mut inner = self.lock();
        let now = OffsetDateTime::now_utc();

        let status = inner
            .payments
            .get(&apply.payment_id)
            .map(|p| p.status)
            .ok_or(BillingError::PaymentNotFound)?;
        if status != PaymentStatus::Pending {
            return Err(BillingError::PaymentAlreadyFinalized(status));
        }
        // Validate the tenant before touching the payment so a failure
        // leaves both rows unchanged, like the transactional Postgres path.
        if let Some(activation) = &apply.activate {
            if !inner.tenants.contains_key(&activation.tenant_id) {
                return Err(BillingError::TenantNotFound);
            }
        }

        let record = {
            let payment = inner
                .payments
                .get_mut(&apply.payment_id)
                .ok_or(BillingError::PaymentNotFound)?;
            payment.status = apply.status;
            if let Some(notes) = apply.notes {
                payment.notes = notes;
            }
            payment.verified_by = Some(apply.operator_id);
            payment.verified_at = Some(now);
            payment.period_start = apply.period_start;
            payment.period_end = apply.period_end;
            payment.updated_at = now;
            payment.clone()
        };

        if let Some(activation) = apply.activate {
            let tenant = inner
                .tenants
                .get_mut(&activation.tenant_id)
                .ok_or(BillingError::TenantNotFound)?;
            tenant.subscription_tier_id = activation.subscription_tier_id;
            tenant.subscription_status = SubscriptionStatus::Active;
            tenant.subscription_expires_at = Some(activation.expires_at);
            tenant.is_access_restricted = false;
            tenant.updated_at = now;
        }

        Ok(record)
    }
}

#[async_trait]
impl TierStore for MemoryStore {
    async fn create(&self, tier: NewTier) -> BillingResult<SubscriptionTier> {
        let mut inner = self.lock();
        inner.next_tier_id += 1;
        let now = OffsetDateTime::now_utc();
        let created = SubscriptionTier {
            id: inner.next_tier_id,
            name: tier.name,
            min_users: tier.min_users,
            max_users: tier.max_users,
            price_cents: tier.price_cents,
            description: tier.description,
            created_at: now,
            updated_at: now,
        };
        inner.tiers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> BillingResult<SubscriptionTier> {
        self.lock()
            .tiers
            .get(&id)
            .cloned()
            .ok_or(BillingError::TierNotFound)
    }

    async fn list(&self) -> BillingResult<Vec<SubscriptionTier>> {
        let mut tiers: Vec<SubscriptionTier> = self.lock().tiers.values().cloned().collect();
        tiers.sort_by_key(|t| t.min_users);
        Ok(tiers)
    }

    async fn update(&self, id: i64, tier: NewTier) -> BillingResult<SubscriptionTier> {
        let mut inner = self.lock();
        let existing = inner.tiers.get_mut(&id).ok_or(BillingError::TierNotFound)?;
        existing.name = tier.name;
        existing.min_users = tier.min_users;
        existing.max_users = tier.max_users;
        existing.price_cents = tier.price_cents;
        existing.description = tier.description;
        existing.updated_at = OffsetDateTime::now_utc();
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> BillingResult<()> {
        self.lock()
            .tiers
            .remove(&id)
            .map(|_| ())
            .ok_or(BillingError::TierNotFound)
    }

    async fn tier_for_user_count(&self, user_count: i32) -> BillingResult<SubscriptionTier> {
        self.lock()
            .tiers
            .values()
            .filter(|t| t.covers(user_count))
            .max_by_key(|t| t.price_cents)
            .cloned()
            .ok_or(BillingError::TierNotFound)
    }
}
