//! VaultX Crypto - Self-describing authenticated encryption
//!
//! Provides:
//! - [`kdf`] - PBKDF2-HMAC-SHA256 password key derivation
//! - [`envelope`] - The binary `IIC1` envelope format (AES-256-GCM)
//! - [`name_token`] - URL-safe textual encryption of file names
//! - [`file`] - Async file helpers with atomic output
//! - [`password`] - bcrypt hashing of account passwords
//!
//! Every envelope and token carries its own salt, IV and iteration count,
//! so only the password is needed to decrypt it.

mod cipher;
pub mod envelope;
pub mod file;
pub mod kdf;
pub mod name_token;
pub mod password;

pub use envelope::{decrypt, encrypt, inspect, EncryptOptions, EnvelopeHeader};
pub use file::{decrypt_file, encrypt_file};
pub use kdf::{derive_key, DerivedKey, DEFAULT_ITERATIONS, MIN_ITERATIONS, SALT_LEN};
pub use name_token::{decrypt_name, encrypt_name, encrypt_name_with};
pub use password::{
    hash_password, hash_password_async, verify_password, verify_password_async, PASSWORD_COST,
};

use thiserror::Error;

/// Errors raised by the envelope codec and key derivation
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Malformed arguments (empty password, wrong salt length, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Structurally invalid envelope (bad magic, truncated buffer)
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Structurally invalid name token
    #[error("Invalid name token: {0}")]
    InvalidToken(String),

    /// Tag verification failed: wrong password or tampered data
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// bcrypt could not hash or parse a password hash
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Reading or writing an envelope file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
