//! JWT encoding and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims before they are stamped with issue and expiry times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBody {
    /// Subject (user UUID)
    pub sub: String,
    /// User role, only present on access tokens
    pub role: Option<UserRole>,
    pub token_type: TokenType,
    /// JWT ID, only present on refresh tokens
    pub jti: Option<String>,
}

impl TokenBody {
    pub fn access(sub: &str, role: UserRole) -> Self {
        Self {
            sub: sub.to_string(),
            role: Some(role),
            token_type: TokenType::Access,
            jti: None,
        }
    }

    pub fn refresh(sub: &str) -> Self {
        Self {
            sub: sub.to_string(),
            role: None,
            token_type: TokenType::Refresh,
            jti: Some(uuid::Uuid::new_v4().to_string()),
        }
    }
}

/// JWT claims as they appear inside a signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct EncodedToken {
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

/// Signs and verifies tokens with a single HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign `body` so that it expires `ttl_secs` from now.
    /// A negative TTL produces a token that is already expired.
    pub fn encode(&self, body: TokenBody, ttl_secs: i64) -> Result<EncodedToken, JwtError> {
        let now = unix_now()?;
        let exp = now.saturating_add(ttl_secs);

        let claims = Claims {
            sub: body.sub,
            role: body.role,
            token_type: body.token_type,
            jti: body.jti,
            iat: now,
            exp,
        };

        let header = Header::new(Algorithm::HS256);
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(EncodedToken {
            token,
            expires_at: exp,
        })
    }

    /// Verify the signature, then the expiry, and return the claims.
    ///
    /// The signature is checked first, so a tampered token is always `Malformed`
    /// even when its (untrusted) expiry lies in the past.
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                    JwtError::Expired
                } else {
                    JwtError::Malformed(e)
                }
            })
    }
}

fn unix_now() -> Result<i64, JwtError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs();
    i64::try_from(secs).map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// The signature is valid but the expiry has passed
    Expired,
    /// Cannot be parsed, wrong algorithm, or the signature does not match
    Malformed(jsonwebtoken::errors::Error),
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::Malformed(e) => write!(f, "Malformed token: {}", e),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
