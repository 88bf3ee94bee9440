//! Postgres store
//!
//! One pool-backed struct implements all three store traits. The schema is
//! owned by `migrations/`; no runtime schema discovery happens here.

use async_trait::async_trait;
use mesa_shared::{PaymentRecord, PaymentStatus, SubscriptionStatus, SubscriptionTier, Tenant};
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::error::{BillingError, BillingResult};
use crate::store::{
    FinalizePayment, NewTier, PaymentInsert, PaymentStore, TenantStore, TierStore,
};

const TENANT_COLUMNS: &str = "id, user_name, email, company_name, users, \
     subscription_tier_id, subscription_status, subscription_expires_at, \
     is_access_restricted, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, tenant_id, amount_cents, payment_date, payment_method, \
     transaction_id, subscription_tier_id, period_start, period_end, status, notes, \
     verified_by, verified_at, created_at, updated_at";

const TIER_COLUMNS: &str =
    "id, name, min_users, max_users, price_cents, description, created_at, updated_at";

/// Postgres-backed store for tenants, payments and tiers.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn get(&self, id: i64) -> BillingResult<Tenant> {
        sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BillingError::TenantNotFound)
    }

    async fn get_with_tier(
        &self,
        id: i64,
    ) -> BillingResult<(Tenant, Option<SubscriptionTier>)> {
        let tenant = TenantStore::get(self, id).await?;

        let tier = match tenant.subscription_tier_id {
            Some(tier_id) => {
                sqlx::query_as::<_, SubscriptionTier>(&format!(
                    "SELECT {TIER_COLUMNS} FROM subscription_tiers WHERE id = $1"
                ))
                .bind(tier_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

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
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET subscription_tier_id = $2,
                subscription_status = $3,
                subscription_expires_at = $4,
                is_access_restricted = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(tier_id)
        .bind(status)
        .bind(expires_at)
        .bind(is_restricted)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BillingError::TenantNotFound);
        }

        Ok(())
    }

    async fn expiring_within(&self, days: i64) -> BillingResult<Vec<Tenant>> {
        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            SELECT {TENANT_COLUMNS}
            FROM tenants
            WHERE subscription_status = 'active'
              AND subscription_expires_at IS NOT NULL
              AND subscription_expires_at <= NOW() + ($1 * INTERVAL '1 day')
            ORDER BY subscription_expires_at ASC
            "#
        ))
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        Ok(tenants)
    }

    async fn expire_subscriptions(&self) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET subscription_status = 'expired',
                is_access_restricted = TRUE,
                updated_at = NOW()
            WHERE subscription_status = 'active'
              AND subscription_expires_at IS NOT NULL
              AND subscription_expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn check_access(&self, id: i64) -> BillingResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT NOT is_access_restricted FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BillingError::TenantNotFound)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn create(&self, payment: PaymentInsert) -> BillingResult<PaymentRecord> {
        let record = sqlx::query_as::<_, PaymentRecord>(&format!(
            r#"
            INSERT INTO payment_history (
                tenant_id, amount_cents, payment_date, payment_method,
                transaction_id, subscription_tier_id, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.tenant_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_date)
        .bind(&payment.payment_method)
        .bind(&payment.transaction_id)
        .bind(payment.subscription_tier_id)
        .bind(&payment.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get(&self, id: i64) -> BillingResult<PaymentRecord> {
        sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BillingError::PaymentNotFound)
    }

    async fn list_for_tenant(&self, tenant_id: i64) -> BillingResult<Vec<PaymentRecord>> {
        let records = sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history \
             WHERE tenant_id = $1 ORDER BY payment_date DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_all(&self) -> BillingResult<Vec<PaymentRecord>> {
        let records = sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history ORDER BY payment_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_pending(&self) -> BillingResult<Vec<PaymentRecord>> {
        let records = sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history \
             WHERE status = 'pending' ORDER BY payment_date ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn latest_verified(&self, tenant_id: i64) -> BillingResult<Option<PaymentRecord>> {
        let record = sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history \
             WHERE tenant_id = $1 AND status = 'verified' \
             ORDER BY verified_at DESC LIMIT 1"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn finalize_payment(&self, apply: FinalizePayment) -> BillingResult<PaymentRecord> {
        let mut tx = self.pool.begin().await?;

        // The status guard makes concurrent finalization attempts lose
        // deterministically: only one UPDATE can match the pending row.
        let payment = sqlx::query_as::<_, PaymentRecord>(&format!(
            r#"
            UPDATE payment_history
            SET status = $2,
                notes = COALESCE($3, notes),
                verified_by = $4,
                verified_at = NOW(),
                period_start = $5,
                period_end = $6,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(apply.payment_id)
        .bind(apply.status)
        .bind(apply.notes.as_deref())
        .bind(apply.operator_id)
        .bind(apply.period_start)
        .bind(apply.period_end)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(payment) = payment else {
            let existing = sqlx::query_scalar::<_, PaymentStatus>(
                "SELECT status FROM payment_history WHERE id = $1",
            )
            .bind(apply.payment_id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match existing {
                Some(status) => BillingError::PaymentAlreadyFinalized(status),
                None => BillingError::PaymentNotFound,
            });
        };

        if let Some(activation) = apply.activate {
            let result = sqlx::query(
                r#"
                UPDATE tenants
                SET subscription_tier_id = $2,
                    subscription_status = 'active',
                    subscription_expires_at = $3,
                    is_access_restricted = FALSE,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(activation.tenant_id)
            .bind(activation.subscription_tier_id)
            .bind(activation.expires_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls the payment update back.
                return Err(BillingError::TenantNotFound);
            }
        }

        tx.commit().await?;
        Ok(payment)
    }
}

#[async_trait]
impl TierStore for PgStore {
    async fn create(&self, tier: NewTier) -> BillingResult<SubscriptionTier> {
        let created = sqlx::query_as::<_, SubscriptionTier>(&format!(
            r#"
            INSERT INTO subscription_tiers (name, min_users, max_users, price_cents, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TIER_COLUMNS}
            "#
        ))
        .bind(&tier.name)
        .bind(tier.min_users)
        .bind(tier.max_users)
        .bind(tier.price_cents)
        .bind(&tier.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get(&self, id: i64) -> BillingResult<SubscriptionTier> {
        sqlx::query_as::<_, SubscriptionTier>(&format!(
            "SELECT {TIER_COLUMNS} FROM subscription_tiers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BillingError::TierNotFound)
    }

    async fn list(&self) -> BillingResult<Vec<SubscriptionTier>> {
        let tiers = sqlx::query_as::<_, SubscriptionTier>(&format!(
            "SELECT {TIER_COLUMNS} FROM subscription_tiers ORDER BY min_users ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tiers)
    }

    async fn update(&self, id: i64, tier: NewTier) -> BillingResult<SubscriptionTier> {
        sqlx::query_as::<_, SubscriptionTier>(&format!(
            r#"
            UPDATE subscription_tiers
            SET name = $2, min_users = $3, max_users = $4,
                price_cents = $5, description = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {TIER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&tier.name)
        .bind(tier.min_users)
        .bind(tier.max_users)
        .bind(tier.price_cents)
        .bind(&tier.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BillingError::TierNotFound)
    }

    async fn delete(&self, id: i64) -> BillingResult<()> {
        let result = sqlx::query("DELETE FROM subscription_tiers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BillingError::TierNotFound);
        }

        Ok(())
    }

    async fn tier_for_user_count(&self, user_count: i32) -> BillingResult<SubscriptionTier> {
        sqlx::query_as::<_, SubscriptionTier>(&format!(
            r#"
            SELECT {TIER_COLUMNS}
            FROM subscription_tiers
            WHERE min_users <= $1 AND (max_users IS NULL OR max_users >= $1)
            ORDER BY price_cents DESC
            LIMIT 1
            "#
        ))
        .bind(user_count)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BillingError::TierNotFound)
    }
}
