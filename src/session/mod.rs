//! Session lifecycle: register, login, refresh, logout.
//!
//! Each user has at most one active refresh token, stored on the user row.
//! Issuing a new pair always overwrites it, so:
//! - a refresh token can be exchanged exactly once (rotation)
//! - logout clears it and ends the session everywhere
//! - a second login or register supersedes any earlier session
//!
//! Refresh uses a compare-and-swap on the stored token, so two concurrent
//! refreshes presenting the same token cannot both succeed.

pub mod validate;

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{Database, PublicUser, User, UserRole, is_unique_violation};
use crate::error::{ApiError, ResultExt};
use crate::jwt::{TokenIssuer, TokenPair, TokenType};
use crate::password::PasswordHasher;

/// Generic login failure. Does not reveal whether the email or the password was wrong.
const INVALID_CREDENTIALS: &str = "Incorrect email or password";

/// Result of register and login: the public user view and a fresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// Orchestrates the session state of each user over the store and the token issuer.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    issuer: Arc<TokenIssuer>,
    passwords: PasswordHasher,
}

impl SessionManager {
    pub fn new(db: Database, issuer: Arc<TokenIssuer>, passwords: PasswordHasher) -> Self {
        Self {
            db,
            issuer,
            passwords,
        }
    }

    /// Create a user and start its first session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, ApiError> {
        let email = validate::email(email)?;
        let password = validate::password(password)?;
        let name = validate::name(name)?;

        let existing = self
            .db
            .users()
            .get_by_email(email)
            .await
            .db_err("Failed to look up email")?;
        if existing.is_some() {
            return Err(ApiError::conflict("Email already taken"));
        }

        let password_hash = self
            .passwords
            .hash(password)
            .await
            .internal_err("Failed to hash password")?;

        // The user row and its first refresh token land in one insert
        let uuid = uuid::Uuid::new_v4().to_string();
        let tokens = self
            .issuer
            .issue_for(&uuid, UserRole::Member)
            .internal_err("Failed to issue tokens")?;

        if let Err(e) = self
            .db
            .users()
            .create(
                &uuid,
                email,
                name,
                &password_hash,
                Some(&tokens.refresh.token),
            )
            .await
        {
            // Lost a race with a concurrent registration of the same email
            if is_unique_violation(&e) {
                return Err(ApiError::conflict("Email already taken"));
            }
            return Err(ApiError::db_error("Failed to create user", e));
        }

        let user = self
            .db
            .users()
            .get_by_uuid(&uuid)
            .await
            .db_err("Failed to load new user")?
            .ok_or_else(ApiError::internal)?;

        info!(user = %user.uuid, "User registered");

        Ok(AuthSession {
            user: user.public(),
            tokens,
        })
    }

    /// Check credentials and start a new session, replacing any previous one.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let email = validate::email(email)?;
        let password = validate::password(password)?;

        let Some(user) = self
            .db
            .users()
            .get_by_email(email)
            .await
            .db_err("Failed to look up email")?
        else {
            // Spend the same argon2 work as a real check before rejecting
            self.passwords
                .verify_decoy(password)
                .await
                .internal_err("Failed to verify password")?;
            return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
        };

        let matches = self
            .passwords
            .verify(password, &user.password_hash)
            .await
            .internal_err("Failed to verify password")?;
        if !matches {
            return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
        }

        let tokens = self.start_session(&user).await?;
        info!(user = %user.uuid, "User logged in");

        Ok(AuthSession {
            user: user.public(),
            tokens,
        })
    }

    /// Exchange the current refresh token for a new pair.
    ///
    /// The presented token must verify, be a refresh token, and be exactly the one
    /// stored for its user. On success it is replaced and can never be used again.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair, ApiError> {
        let presented = refresh_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Refresh token is required"))?;

        let claims = self
            .issuer
            .codec()
            .decode(presented)
            .map_err(|_| ApiError::unauthenticated("Invalid refresh token"))?;

        if claims.token_type != TokenType::Refresh {
            return Err(ApiError::unauthenticated("Invalid token type"));
        }

        let user = self
            .db
            .users()
            .get_by_uuid(&claims.sub)
            .await
            .db_err("Failed to load user")?
            .ok_or_else(|| ApiError::unauthenticated("User not found or token revoked"))?;

        let tokens = self
            .issuer
            .issue(&user)
            .internal_err("Failed to issue tokens")?;

        let rotated = self
            .db
            .sessions()
            .rotate(&user.uuid, presented, &tokens.refresh.token)
            .await
            .db_err("Failed to rotate refresh token")?;
        if !rotated {
            warn!(user = %user.uuid, "Rejected superseded or revoked refresh token");
            return Err(ApiError::unauthenticated("User not found or token revoked"));
        }

        info!(user = %user.uuid, "Tokens refreshed");
        Ok(tokens)
    }

    /// Revoke the user's session. Succeeds even if it was already revoked.
    pub async fn logout(&self, user_uuid: &str) -> Result<(), ApiError> {
        self.db
            .sessions()
            .revoke(user_uuid)
            .await
            .db_err("Failed to revoke session")?;
        info!(user = %user_uuid, "User logged out");
        Ok(())
    }

    /// Public view of the user, or `NotFound` if it was deleted since the token was issued.
    pub async fn current_user(&self, user_uuid: &str) -> Result<PublicUser, ApiError> {
        self.db
            .users()
            .get_by_uuid(user_uuid)
            .await
            .db_err("Failed to load user")?
            .map(|user| user.public())
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Public views of every user except `user_uuid`.
    pub async fn list_others(&self, user_uuid: &str) -> Result<Vec<PublicUser>, ApiError> {
        let users = self
            .db
            .users()
            .list_except(user_uuid)
            .await
            .db_err("Failed to list users")?;
        Ok(users.iter().map(User::public).collect())
    }

    /// Public views of every user.
    pub async fn list_all(&self) -> Result<Vec<PublicUser>, ApiError> {
        let users = self
            .db
            .users()
            .list_all()
            .await
            .db_err("Failed to list users")?;
        Ok(users.iter().map(User::public).collect())
    }

    /// Issue a pair and store its refresh token as the user's only session.
    async fn start_session(&self, user: &User) -> Result<TokenPair, ApiError> {
        let tokens = self
            .issuer
            .issue(user)
            .internal_err("Failed to issue tokens")?;

        let stored = self
            .db
            .sessions()
            .set(&user.uuid, Some(&tokens.refresh.token))
            .await
            .db_err("Failed to store refresh token")?;
        if !stored {
            return Err(ApiError::not_found("User not found"));
        }

        Ok(tokens)
    }
}
