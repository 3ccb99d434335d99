//! Account password hashing
//!
//! Passwords are stored as bcrypt hashes in the standard `$2b$` text form.
//! The async variants run hashing and verification on the blocking pool.

use tracing::instrument;

use crate::{CryptoError, Result};

/// bcrypt cost used for new account hashes
pub const PASSWORD_COST: u32 = 10;

/// Hashes `password` with the given bcrypt cost
///
/// # Errors
/// [`CryptoError::InvalidInput`] for an empty password,
/// [`CryptoError::PasswordHash`] if bcrypt rejects the cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    if password.is_empty() {
        return Err(CryptoError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }
    bcrypt::hash(password, cost).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Checks `password` against a stored hash
///
/// A wrong password is `Ok(false)`; only an unreadable hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// [`hash_password`] on the blocking pool
#[instrument(skip(password))]
pub async fn hash_password_async(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| CryptoError::Io(std::io::Error::other(e)))?
}

/// [`verify_password`] on the blocking pool
#[instrument(skip_all)]
pub async fn verify_password_async(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| CryptoError::Io(std::io::Error::other(e)))?
}
