//! Password-based key derivation
//!
//! PBKDF2-HMAC-SHA256 producing a 256-bit AES key. The iteration count is
//! stored in every envelope, so raising [`DEFAULT_ITERATIONS`] later leaves
//! existing envelopes decryptable.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// Derived key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Iteration count used for new envelopes
pub const DEFAULT_ITERATIONS: u32 = 150_000;

/// Lowest iteration count accepted, including from envelope headers
pub use vaultx_core::config::MIN_ITERATIONS;

/// A derived AES-256 key, wiped from memory on drop
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(***)")
    }
}

/// Derives a 32-byte key from `password` and `salt`
///
/// Deterministic: the same inputs always yield the same key.
///
/// # Errors
/// [`CryptoError::InvalidInput`] if the password is empty, the salt is not
/// exactly [`SALT_LEN`] bytes, or `iterations` is below [`MIN_ITERATIONS`].
pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Result<DerivedKey> {
    if password.is_empty() {
        return Err(CryptoError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }
    if salt.len() != SALT_LEN {
        return Err(CryptoError::InvalidInput(format!(
            "salt must be {SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }
    if iterations < MIN_ITERATIONS {
        return Err(CryptoError::InvalidInput(format!(
            "iteration count {iterations} is below the minimum of {MIN_ITERATIONS}"
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key[..]);
    Ok(DerivedKey(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; SALT_LEN] = [7u8; SALT_LEN];

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_key("hunter2", &SALT, MIN_ITERATIONS).unwrap();
        let b = derive_key("hunter2", &SALT, MIN_ITERATIONS).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_inputs_change_the_key() {
        let base = derive_key("hunter2", &SALT, MIN_ITERATIONS).unwrap();
        let other_password = derive_key("hunter3", &SALT, MIN_ITERATIONS).unwrap();
        let other_salt = derive_key("hunter2", &[8u8; SALT_LEN], MIN_ITERATIONS).unwrap();
        let other_count = derive_key("hunter2", &SALT, MIN_ITERATIONS + 1).unwrap();

        assert_ne!(base.as_bytes(), other_password.as_bytes());
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
        assert_ne!(base.as_bytes(), other_count.as_bytes());
    }

    #[test]
    fn test_empty_password_rejected() {
        let err = derive_key("", &SALT, MIN_ITERATIONS).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn test_wrong_salt_length_rejected() {
        for len in [0usize, 8, 15, 17, 32] {
            let salt = vec![1u8; len];
            let err = derive_key("pw", &salt, MIN_ITERATIONS).unwrap_err();
            assert!(matches!(err, CryptoError::InvalidInput(_)), "len {len}");
        }
    }

    #[test]
    fn test_low_iteration_count_rejected() {
        let err = derive_key("pw", &SALT, MIN_ITERATIONS - 1).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let key = derive_key("pw", &SALT, MIN_ITERATIONS).unwrap();
        assert_eq!(format!("{key:?}"), "DerivedKey(***)");
    }
}
