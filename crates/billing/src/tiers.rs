//! Subscription tier management
//!
//! Pricing brackets keyed by tenant user-count ranges. Lookup picks the
//! highest-priced covering tier, which is also the tie-break when ranges
//! overlap. A user count no tier covers is not an error condition for most
//! callers: they proceed with no tier association and a fee of zero.

use std::sync::Arc;

use mesa_shared::SubscriptionTier;

use crate::error::BillingResult;
use crate::store::{NewTier, TierStore};

/// Tier CRUD and fee lookup.
#[derive(Clone)]
pub struct TierService {
    tiers: Arc<dyn TierStore>,
}

impl TierService {
    pub fn new(tiers: Arc<dyn TierStore>) -> Self {
        Self { tiers }
    }

    pub async fn create_tier(&self, tier: NewTier) -> BillingResult<SubscriptionTier> {
        let created = self.tiers.create(tier).await?;
        tracing::info!(
            tier_id = created.id,
            name = %created.name,
            price_cents = created.price_cents,
            "Created subscription tier"
        );
        Ok(created)
    }

    pub async fn get_tier(&self, id: i64) -> BillingResult<SubscriptionTier> {
        self.tiers.get(id).await
    }

    pub async fn list_tiers(&self) -> BillingResult<Vec<SubscriptionTier>> {
        self.tiers.list().await
    }

    pub async fn update_tier(&self, id: i64, tier: NewTier) -> BillingResult<SubscriptionTier> {
        let updated = self.tiers.update(id, tier).await?;
        tracing::info!(tier_id = id, "Updated subscription tier");
        Ok(updated)
    }

    pub async fn delete_tier(&self, id: i64) -> BillingResult<()> {
        self.tiers.delete(id).await?;
        tracing::info!(tier_id = id, "Deleted subscription tier");
        Ok(())
    }

    /// Highest-priced tier covering `user_count`; `TierNotFound` if none.
    pub async fn tier_for_user_count(&self, user_count: i32) -> BillingResult<SubscriptionTier> {
        self.tiers.tier_for_user_count(user_count).await
    }

    /// Monthly fee in cents for a tenant of `user_count` users, with the
    /// tier that produced it.
    pub async fn calculate_monthly_fee(
        &self,
        user_count: i32,
    ) -> BillingResult<(i64, SubscriptionTier)> {
        let tier = self.tiers.tier_for_user_count(user_count).await?;
        Ok((tier.price_cents, tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BillingError;
    use crate::store::MemoryStore;

    fn service() -> TierService {
        TierService::new(Arc::new(MemoryStore::new()))
    }

    fn tier(name: &str, min: i32, max: Option<i32>, price_cents: i64) -> NewTier {
        NewTier {
            name: name.to_string(),
            min_users: min,
            max_users: max,
            price_cents,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn lookup_picks_highest_priced_covering_tier() {
        let svc = service();
        svc.create_tier(tier("basic", 0, Some(100), 1000)).await.unwrap();
        svc.create_tier(tier("promo", 50, Some(150), 800)).await.unwrap();
        svc.create_tier(tier("plus", 50, Some(150), 2500)).await.unwrap();

        // 75 is covered by all three; the most expensive wins.
        let got = svc.tier_for_user_count(75).await.unwrap();
        assert_eq!(got.name, "plus");
    }

    #[tokio::test]
    async fn lookup_respects_unbounded_tier() {
        let svc = service();
        svc.create_tier(tier("smb", 0, Some(199), 2500)).await.unwrap();
        svc.create_tier(tier("enterprise", 200, None, 5000)).await.unwrap();

        let got = svc.tier_for_user_count(50_000).await.unwrap();
        assert_eq!(got.name, "enterprise");
    }

    #[tokio::test]
    async fn lookup_fails_when_no_tier_covers() {
        let svc = service();
        svc.create_tier(tier("smb", 10, Some(99), 2500)).await.unwrap();

        let err = svc.tier_for_user_count(5).await.unwrap_err();
        assert!(matches!(err, BillingError::TierNotFound));
    }

    #[tokio::test]
    async fn fee_comes_from_covering_tier() {
        let svc = service();
        svc.create_tier(tier("starter", 0, Some(99), 1000)).await.unwrap();
        svc.create_tier(tier("growth", 100, Some(199), 2500)).await.unwrap();
        svc.create_tier(tier("enterprise", 200, None, 5000)).await.unwrap();

        let (fee, t) = svc.calculate_monthly_fee(150).await.unwrap();
        assert_eq!(fee, 2500);
        assert_eq!(t.name, "growth");
    }

    #[tokio::test]
    async fn update_and_delete_missing_tier_return_not_found() {
        let svc = service();
        let err = svc
            .update_tier(42, tier("x", 0, None, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::TierNotFound));

        let err = svc.delete_tier(42).await.unwrap_err();
        assert!(matches!(err, BillingError::TierNotFound));
    }

    #[tokio::test]
    async fn list_is_ordered_by_min_users() {
        let svc = service();
        svc.create_tier(tier("big", 200, None, 5000)).await.unwrap();
        svc.create_tier(tier("small", 0, Some(99), 1000)).await.unwrap();

        let names: Vec<String> = svc
            .list_tiers()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["small", "big"]);
    }
}
