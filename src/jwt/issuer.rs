//! Access/refresh pair issuance.

use serde::Serialize;
use std::time::Duration;

use super::codec::{JwtError, TokenBody, TokenCodec};
use crate::db::{User, UserRole};

/// One signed token with its expiry, as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires: i64,
}

/// A matching access/refresh pair. Never mutated, only replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Builds token pairs from an authenticated user.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            codec: TokenCodec::new(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// The codec sharing this issuer's secret, used to verify presented tokens.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Issue a new access/refresh pair for `user`.
    pub fn issue(&self, user: &User) -> Result<TokenPair, JwtError> {
        self.issue_for(&user.uuid, user.role)
    }

    /// Issue a pair for a user id that may not be stored yet.
    pub fn issue_for(&self, sub: &str, role: UserRole) -> Result<TokenPair, JwtError> {
        let access = self
            .codec
            .encode(TokenBody::access(sub, role), ttl_secs(self.access_ttl))?;
        let refresh = self
            .codec
            .encode(TokenBody::refresh(sub), ttl_secs(self.refresh_ttl))?;

        Ok(TokenPair {
            access: IssuedToken {
                token: access.token,
                expires: access.expires_at,
            },
            refresh: IssuedToken {
                token: refresh.token,
                expires: refresh.expires_at,
            },
        })
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRole;
    use crate::jwt::TokenType;

    fn test_user(role: UserRole) -> User {
        User {
            id: 1,
            uuid: "uuid-123".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            password_hash: "unused".to_string(),
            role,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            b"test-secret-key-for-testing",
            Duration::from_secs(5 * 60),
            Duration::from_secs(14 * 24 * 60 * 60),
        )
    }

    #[test]
    fn test_issue_pair_kinds_and_claims() {
        let issuer = issuer();
        let pair = issuer.issue(&test_user(UserRole::Member)).unwrap();

        let access = issuer.codec().decode(&pair.access.token).unwrap();
        assert_eq!(access.sub, "uuid-123");
        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(access.role, Some(UserRole::Member));

        let refresh = issuer.codec().decode(&pair.refresh.token).unwrap();
        assert_eq!(refresh.sub, "uuid-123");
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(refresh.role.is_none());
    }

    #[test]
    fn test_issue_uses_configured_ttls() {
        let issuer = issuer();
        let pair = issuer.issue(&test_user(UserRole::Member)).unwrap();

        let access = issuer.codec().decode(&pair.access.token).unwrap();
        let refresh = issuer.codec().decode(&pair.refresh.token).unwrap();

        assert_eq!(access.exp - access.iat, 5 * 60);
        assert_eq!(refresh.exp - refresh.iat, 14 * 24 * 60 * 60);
        assert_eq!(pair.access.expires, access.exp);
        assert_eq!(pair.refresh.expires, refresh.exp);
    }

    #[test]
    fn test_admin_role_in_access_token() {
        let issuer = issuer();
        let pair = issuer.issue(&test_user(UserRole::Admin)).unwrap();

        let claims = issuer.codec().decode(&pair.access.token).unwrap();
        assert_eq!(claims.role, Some(UserRole::Admin));
    }

    #[test]
    fn test_consecutive_pairs_have_distinct_refresh_tokens() {
        let issuer = issuer();
        let user = test_user(UserRole::Member);

        let first = issuer.issue(&user).unwrap();
        let second = issuer.issue(&user).unwrap();

        assert_ne!(first.refresh.token, second.refresh.token);
    }

    #[test]
    fn test_pair_serialization_shape() {
        let pair = issuer().issue(&test_user(UserRole::Member)).unwrap();
        let json = serde_json::to_value(&pair).unwrap();

        assert!(json["access"]["token"].is_string());
        assert!(json["access"]["expires"].is_i64());
        assert!(json["refresh"]["token"].is_string());
        assert!(json["refresh"]["expires"].is_i64());
    }
}
