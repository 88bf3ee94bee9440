//! Authentication for the Mesa API

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtManager, ROLE_ADMIN, ROLE_SUPERADMIN};
pub use middleware::{require_auth, require_superadmin, AuthUser};
