//! Core domain models
//!
//! Tenants ("admin" accounts running a restaurant/retail business on the
//! platform), subscription pricing tiers, and the payment ledger.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Per-tenant subscription state.
///
/// Mutated only by payment verification (-> `Active`), the expiration sweep
/// or lazy status reconciliation (`Active` -> `Expired`). A tenant that has
/// never paid stays at `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum SubscriptionStatus {
    None,
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a payment record.
///
/// `Pending -> {Verified, Rejected}`, terminal thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pricing bracket keyed by tenant user-count range.
///
/// `min_users..=max_users` inclusive; `max_users = None` means unbounded.
/// Ranges are expected to partition the user-count domain but nothing
/// enforces that; overlaps resolve to the highest-priced covering tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionTier {
    pub id: i64,
    pub name: String,
    pub min_users: i32,
    pub max_users: Option<i32>,
    /// Monthly price in cents.
    pub price_cents: i64,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SubscriptionTier {
    /// Whether this tier's range covers the given user count.
    pub fn covers(&self, user_count: i32) -> bool {
        self.min_users <= user_count && self.max_users.is_none_or(|max| max >= user_count)
    }
}

/// An "admin" account representing a business using the platform.
///
/// Only the identity and subscription fields used by the billing core are
/// modeled here; banner/notification/restaurant ownership lives elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub company_name: String,
    /// Current headcount, drives tier selection.
    pub users: i32,
    pub subscription_tier_id: Option<i64>,
    pub subscription_status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_expires_at: Option<OffsetDateTime>,
    /// When true every gated API request from this tenant is refused.
    pub is_access_restricted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One row in the append-mostly payment ledger.
///
/// Created in `Pending` state by a tenant self-report; a privileged operator
/// later finalizes it exactly once. Amount and payment date are immutable
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentRecord {
    pub id: i64,
    pub tenant_id: i64,
    /// Amount paid in cents.
    pub amount_cents: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub payment_date: OffsetDateTime,
    pub payment_method: String,
    pub transaction_id: String,
    pub subscription_tier_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub period_start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub period_end: Option<OffsetDateTime>,
    pub status: PaymentStatus,
    pub notes: String,
    /// Operator who finalized the record, if any.
    pub verified_by: Option<i64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(min: i32, max: Option<i32>) -> SubscriptionTier {
        SubscriptionTier {
            id: 1,
            name: "basic".to_string(),
            min_users: min,
            max_users: max,
            price_cents: 1000,
            description: String::new(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn tier_covers_bounded_range_inclusively() {
        let t = tier(10, Some(20));
        assert!(!t.covers(9));
        assert!(t.covers(10));
        assert!(t.covers(20));
        assert!(!t.covers(21));
    }

    #[test]
    fn tier_covers_unbounded_range() {
        let t = tier(200, None);
        assert!(!t.covers(199));
        assert!(t.covers(200));
        assert!(t.covers(1_000_000));
    }

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!(SubscriptionStatus::Active.as_str(), "active");
        assert_eq!(PaymentStatus::Pending.as_str(), "pending");
    }
}
