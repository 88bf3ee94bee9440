#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Mesa shared types
//!
//! Domain models and configuration used by the billing core, the API server
//! and the background worker.

pub mod config;
pub mod db;
pub mod models;

pub use config::Config;
pub use db::create_pool;
pub use models::{
    PaymentRecord, PaymentStatus, SubscriptionStatus, SubscriptionTier, Tenant,
};
