//! Application state

use mesa_billing::BillingService;

use crate::auth::JwtManager;

/// Shared application state, cloned into every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub jwt_manager: JwtManager,
    pub billing: BillingService,
}

impl AppState {
    pub fn new(jwt_manager: JwtManager, billing: BillingService) -> Self {
        Self {
            jwt_manager,
            billing,
        }
    }
}
