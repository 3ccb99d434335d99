//! Binary envelope format
//!
//! ```text
//! bytes 0..4     magic "IIC1"
//! byte  4        salt length (16)
//! byte  5        iv length (12)
//! bytes 6..10    PBKDF2 iterations, u32 big-endian
//! bytes 10..26   salt
//! bytes 26..38   iv
//! bytes 38..n-16 AES-256-GCM ciphertext
//! last 16 bytes  GCM tag
//! ```
//!
//! The header is not bound as associated data, which keeps the format
//! readable by other implementations of it; a modified salt, IV or
//! iteration count changes the derived key or nonce and fails the tag check.

use tracing::trace;

use crate::cipher::{self, IV_LEN, TAG_LEN};
use crate::kdf::{DEFAULT_ITERATIONS, MIN_ITERATIONS, SALT_LEN};
use crate::{CryptoError, Result};

/// Format identifier at the start of every envelope
pub const MAGIC: &[u8; 4] = b"IIC1";

/// Fixed header length: magic, two length bytes, iterations, salt, iv
pub const HEADER_LEN: usize = 4 + 1 + 1 + 4 + SALT_LEN + IV_LEN;

/// Smallest valid envelope (empty plaintext)
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + TAG_LEN;

/// Optional overrides for [`encrypt`]
///
/// Unset salt and IV are drawn from the OS RNG on every call. Supplying an
/// IV is only meant for reproducible tests: reusing one with the same key
/// breaks GCM.
#[derive(Debug, Clone, Default)]
pub struct EncryptOptions {
    pub salt: Option<[u8; SALT_LEN]>,
    pub iv: Option<[u8; IV_LEN]>,
    pub iterations: Option<u32>,
}

impl EncryptOptions {
    /// Options with only the iteration count set
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: Some(iterations),
            ..Self::default()
        }
    }
}

/// Parsed envelope header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub iterations: u32,
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    /// Ciphertext length, excluding the tag
    pub ciphertext_len: usize,
}

/// Encrypts `plaintext` into a self-describing envelope
///
/// # Errors
/// [`CryptoError::InvalidInput`] for an empty password or an iteration
/// count below the minimum.
pub fn encrypt(password: &str, plaintext: &[u8], options: &EncryptOptions) -> Result<Vec<u8>> {
    let iterations = options.iterations.unwrap_or(DEFAULT_ITERATIONS);
    let salt = options.salt.unwrap_or_else(cipher::random_bytes);
    let iv = options.iv.unwrap_or_else(cipher::random_bytes);

    let sealed = cipher::seal(password, &salt, &iv, iterations, plaintext)?;

    let mut envelope = Vec::with_capacity(HEADER_LEN + sealed.len());
    envelope.extend_from_slice(MAGIC);
    envelope.push(SALT_LEN as u8);
    envelope.push(IV_LEN as u8);
    envelope.extend_from_slice(&iterations.to_be_bytes());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&sealed);

    trace!(
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        iterations,
        "Encrypted envelope"
    );
    Ok(envelope)
}

/// Verifies and decrypts an envelope
///
/// # Errors
/// - [`CryptoError::MalformedEnvelope`] for a short buffer, wrong magic, or
///   unsupported header fields
/// - [`CryptoError::AuthenticationFailure`] for a wrong password or any
///   modification of the salt, IV, ciphertext or tag
pub fn decrypt(password: &str, envelope: &[u8]) -> Result<Vec<u8>> {
    let header = inspect(envelope)?;
    let plaintext = cipher::open(
        password,
        &header.salt,
        &header.iv,
        header.iterations,
        &envelope[HEADER_LEN..],
    )?;
    trace!(plaintext_len = plaintext.len(), "Decrypted envelope");
    Ok(plaintext)
}

/// Parses and checks the header without decrypting
///
/// # Errors
/// [`CryptoError::MalformedEnvelope`] under the same conditions as [`decrypt`].
pub fn inspect(envelope: &[u8]) -> Result<EnvelopeHeader> {
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(CryptoError::MalformedEnvelope(format!(
            "envelope is {} bytes, need at least {MIN_ENVELOPE_LEN}",
            envelope.len()
        )));
    }
    if &envelope[..4] != MAGIC {
        return Err(CryptoError::MalformedEnvelope(
            "unrecognized magic bytes".to_string(),
        ));
    }

    let salt_len = envelope[4] as usize;
    let iv_len = envelope[5] as usize;
    if salt_len != SALT_LEN || iv_len != IV_LEN {
        return Err(CryptoError::MalformedEnvelope(format!(
            "unsupported salt/iv lengths {salt_len}/{iv_len}"
        )));
    }

    let iterations = u32::from_be_bytes([envelope[6], envelope[7], envelope[8], envelope[9]]);
    if iterations < MIN_ITERATIONS {
        return Err(CryptoError::MalformedEnvelope(format!(
            "iteration count {iterations} is below the minimum of {MIN_ITERATIONS}"
        )));
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&envelope[10..10 + SALT_LEN]);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&envelope[10 + SALT_LEN..HEADER_LEN]);

    Ok(EnvelopeHeader {
        iterations,
        salt,
        iv,
        ciphertext_len: envelope.len() - MIN_ENVELOPE_LEN,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "correct horse battery staple";

    fn fast() -> EncryptOptions {
        EncryptOptions::with_iterations(MIN_ITERATIONS)
    }

    #[test]
    fn test_concrete_example_with_default_iterations() {
        let plaintext = b"file content 12345";
        let envelope = encrypt(PASSWORD, plaintext, &EncryptOptions::default()).unwrap();

        assert_eq!(inspect(&envelope).unwrap().iterations, DEFAULT_ITERATIONS);
        assert_eq!(decrypt(PASSWORD, &envelope).unwrap(), plaintext);

        let err = decrypt("wrong password", &envelope).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailure));
    }

    #[test]
    fn test_layout() {
        let salt = [0xAAu8; SALT_LEN];
        let iv = [0xBBu8; IV_LEN];
        let options = EncryptOptions {
            salt: Some(salt),
            iv: Some(iv),
            iterations: Some(150_000),
        };
        let envelope = encrypt("pw", b"hello", &options).unwrap();

        assert_eq!(&envelope[0..4], b"IIC1");
        assert_eq!(envelope[4], 16);
        assert_eq!(envelope[5], 12);
        assert_eq!(&envelope[6..10], &150_000u32.to_be_bytes());
        assert_eq!(&envelope[10..26], &salt);
        assert_eq!(&envelope[26..38], &iv);
        assert_eq!(envelope.len(), HEADER_LEN + 5 + TAG_LEN);
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        for size in [0usize, 1, 15, 16, 17, 1024, 65_537] {
            let plaintext: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let envelope = encrypt("pw", &plaintext, &fast()).unwrap();
            assert_eq!(decrypt("pw", &envelope).unwrap(), plaintext, "size {size}");
        }
    }

    #[test]
    fn test_empty_plaintext_is_minimum_size() {
        let envelope = encrypt("pw", b"", &fast()).unwrap();
        assert_eq!(envelope.len(), MIN_ENVELOPE_LEN);
        assert!(decrypt("pw", &envelope).unwrap().is_empty());
    }

    #[test]
    fn test_same_input_gives_different_envelopes() {
        let a = encrypt("pw", b"same", &fast()).unwrap();
        let b = encrypt("pw", b"same", &fast()).unwrap();
        assert_ne!(a, b);
        assert_ne!(&a[10..HEADER_LEN], &b[10..HEADER_LEN]);
    }

    #[test]
    fn test_supplied_salt_and_iv_are_deterministic() {
        let options = EncryptOptions {
            salt: Some([1u8; SALT_LEN]),
            iv: Some([2u8; IV_LEN]),
            iterations: Some(MIN_ITERATIONS),
        };
        let a = encrypt("pw", b"same", &options).unwrap();
        let b = encrypt("pw", b"same", &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_password_fails() {
        let envelope = encrypt("alpha", b"secret", &fast()).unwrap();
        let err = decrypt("beta", &envelope).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailure));
    }

    #[test]
    fn test_any_flipped_ciphertext_or_tag_byte_is_detected() {
        let envelope = encrypt("pw", b"tamper me", &fast()).unwrap();
        for index in HEADER_LEN..envelope.len() {
            let mut tampered = envelope.clone();
            tampered[index] ^= 0x01;
            let err = decrypt("pw", &tampered).unwrap_err();
            assert!(
                matches!(err, CryptoError::AuthenticationFailure),
                "byte {index} not detected"
            );
        }
    }

    #[test]
    fn test_flipped_salt_or_iv_byte_is_detected() {
        let envelope = encrypt("pw", b"header", &fast()).unwrap();
        for index in [10usize, 25, 26, 37] {
            let mut tampered = envelope.clone();
            tampered[index] ^= 0x80;
            let err = decrypt("pw", &tampered).unwrap_err();
            assert!(matches!(err, CryptoError::AuthenticationFailure));
        }
    }

    #[test]
    fn test_bad_magic_is_malformed() {
        let mut envelope = encrypt("pw", b"x", &fast()).unwrap();
        envelope[0] = b'X';
        let err = decrypt("pw", &envelope).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_truncated_buffer_is_malformed() {
        let envelope = encrypt("pw", b"", &fast()).unwrap();
        for len in [0usize, 3, 4, HEADER_LEN, MIN_ENVELOPE_LEN - 1] {
            let err = decrypt("pw", &envelope[..len]).unwrap_err();
            assert!(matches!(err, CryptoError::MalformedEnvelope(_)), "len {len}");
        }
    }

    #[test]
    fn test_unsupported_lengths_are_malformed() {
        let mut envelope = encrypt("pw", b"x", &fast()).unwrap();
        envelope[5] = 16;
        let err = inspect(&envelope).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_downgraded_iterations_are_malformed() {
        let mut envelope = encrypt("pw", b"x", &fast()).unwrap();
        envelope[6..10].copy_from_slice(&1u32.to_be_bytes());
        let err = decrypt("pw", &envelope).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_empty_password_is_invalid_input() {
        let err = encrypt("", b"x", &fast()).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn test_inspect_reports_header() {
        let envelope = encrypt("pw", b"twelve bytes", &fast()).unwrap();
        let header = inspect(&envelope).unwrap();
        assert_eq!(header.iterations, MIN_ITERATIONS);
        assert_eq!(header.ciphertext_len, 12);
        assert_eq!(&header.salt[..], &envelope[10..26]);
        assert_eq!(&header.iv[..], &envelope[26..38]);
    }
}
