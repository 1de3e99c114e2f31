//! Argon2id password hashing.
//!
//! Hashing and verification are deliberately slow, so both run on the blocking
//! thread pool instead of the async executor.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier as _, Version,
    password_hash::SaltString,
};
use rand::RngCore;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Hashes and verifies passwords with a fixed Argon2id cost.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of a random password, built on first use by `verify_decoy`
    decoy: Arc<OnceCell<String>>,
}

/// Errors that can occur while hashing.
#[derive(Debug)]
pub enum PasswordError {
    /// Salt generation or hashing failed
    Hash(argon2::password_hash::Error),
    /// The blocking task panicked or was cancelled
    Join(tokio::task::JoinError),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordError::Hash(e) => write!(f, "Failed to hash password: {}", e),
            PasswordError::Join(e) => write!(f, "Password task failed: {}", e),
        }
    }
}

impl std::error::Error for PasswordError {}

impl PasswordHasher {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            decoy: Arc::new(OnceCell::new()),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a PHC string.
    pub fn hash_blocking(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordError::Hash)?;

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(PasswordError::Hash)
    }

    /// Check a password against a stored PHC string.
    /// An unparsable stored hash never matches.
    pub fn verify_blocking(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(PasswordError::Join)?
    }

    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash))
            .await
            .map_err(PasswordError::Join)
    }

    /// Verify against a hash no password matches, at the cost of a real check.
    /// Used when there is no stored hash to compare with.
    pub async fn verify_decoy(&self, password: &str) -> Result<bool, PasswordError> {
        let decoy = self
            .decoy
            .get_or_try_init(|| async {
                let mut secret = [0u8; 32];
                rand::rng().fill_bytes(&mut secret);
                let hasher = self.clone();
                tokio::task::spawn_blocking(move || {
                    hasher.hash_blocking(&format!("{:x?}", secret))
                })
                .await
                .map_err(PasswordError::Join)?
            })
            .await?;
        self.verify(password, decoy).await
    }

    #[cfg(test)]
    pub(crate) fn has_decoy(&self) -> bool {
        self.decoy.get().is_some()
    }
}
