#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Mesa API server library
//!
//! HTTP surface over the billing core: payment self-reporting, operator
//! verification, tier management, and the subscription gate that keeps
//! lapsed tenants out of the rest of the platform.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod subscription;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
