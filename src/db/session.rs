//! Storage for the single active refresh credential of each user.
//!
//! Each user row carries at most one refresh token. Writing a new one replaces the
//! previous one, and clearing it to NULL revokes the session. Access tokens are
//! stateless and never stored.

use sqlx::sqlite::SqlitePool;

/// Store for reading and replacing a user's refresh credential.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the stored refresh token for a user.
    /// Returns `None` if the user does not exist or has no active session.
    pub async fn current(&self, user_uuid: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT refresh_token FROM users WHERE uuid = ?")
                .bind(user_uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(token,)| token))
    }

    /// Unconditionally set (or clear, with `None`) the refresh token.
    /// Returns false if the user does not exist.
    pub async fn set(&self, user_uuid: &str, token: Option<&str>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE uuid = ?")
            .bind(token)
            .bind(user_uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the refresh token only if it still equals `presented`.
    ///
    /// This is a single conditional update, so of two concurrent rotations using the
    /// same token exactly one wins. Returns false if the user is gone or the token
    /// was already superseded or revoked.
    pub async fn rotate(
        &self,
        user_uuid: &str,
        presented: &str,
        next: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = ? WHERE uuid = ? AND refresh_token = ?",
        )
        .bind(next)
        .bind(user_uuid)
        .bind(presented)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the refresh token (logout). Idempotent.
    pub async fn revoke(&self, user_uuid: &str) -> Result<bool, sqlx::Error> {
        self.set(user_uuid, None).await
    }
}
