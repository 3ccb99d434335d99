//! AES-256-GCM primitives shared by the envelope and name-token formats
//!
//! `seal` returns `ciphertext || tag`, which is exactly the tail of an
//! envelope, so callers only prepend their own framing.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::kdf::derive_key;
use crate::{CryptoError, Result};

/// GCM nonce length in bytes
pub(crate) const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes
pub(crate) const TAG_LEN: usize = 16;

/// Fills an array from the OS random number generator
pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Derives the key and encrypts, returning `ciphertext || tag`
pub(crate) fn seal(
    password: &str,
    salt: &[u8],
    iv: &[u8; IV_LEN],
    iterations: u32,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let key = derive_key(password, salt, iterations)?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| CryptoError::InvalidInput("plaintext too large to encrypt".to_string()))
}

/// Derives the key and verifies+decrypts `ciphertext || tag`
///
/// Any tag mismatch is reported as [`CryptoError::AuthenticationFailure`]
/// without saying whether the password or the data was wrong.
pub(crate) fn open(
    password: &str,
    salt: &[u8],
    iv: &[u8; IV_LEN],
    iterations: u32,
    sealed: &[u8],
) -> Result<Vec<u8>> {
    let key = derive_key(password, salt, iterations)?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(iv), sealed)
        .map_err(|_| CryptoError::AuthenticationFailure)
}
