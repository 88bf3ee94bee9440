//! JWT issue/validate
//!
//! The signing secret lives in an explicitly constructed [`JwtManager`]
//! carried in `AppState`; nothing reads it from global state.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Role granted to platform operators. Bypasses the subscription gate and
/// unlocks the /api/superadmin routes.
pub const ROLE_SUPERADMIN: &str = "superadmin";

/// Role granted to tenant administrators.
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Tenant id (or operator id for superadmins).
    pub sub: i64,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_superadmin(&self) -> bool {
        self.role == ROLE_SUPERADMIN
    }
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    pub fn issue(&self, subject: i64, role: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: subject,
            role: role.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.expiry).unix_timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default()).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims() {
        let manager = JwtManager::new("test-secret", 24);
        let token = manager.issue(42, ROLE_ADMIN).unwrap();
        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, ROLE_ADMIN);
        assert!(!claims.is_superadmin());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = JwtManager::new("secret-a", 24).issue(1, ROLE_ADMIN).unwrap();
        assert!(JwtManager::new("secret-b", 24).validate(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let manager = JwtManager::new("test-secret", -1);
        let token = manager.issue(1, ROLE_ADMIN).unwrap();
        assert!(manager.validate(&token).is_err());
    }
}
