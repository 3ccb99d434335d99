//! URL-safe encryption of file names
//!
//! A name token carries the same salt/IV/iterations/tag material as an
//! envelope, laid out as text so it can be used as a file name or a URL path
//! segment without escaping:
//!
//! ```text
//! v1:<salt>:<iv>:<ciphertext>:<tag>:<iterations>
//! ```
//!
//! Binary parts are base64url without padding; `iterations` is decimal.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::cipher::{self, IV_LEN, TAG_LEN};
use crate::envelope::EncryptOptions;
use crate::kdf::{DEFAULT_ITERATIONS, MIN_ITERATIONS, SALT_LEN};
use crate::{CryptoError, Result};

/// Format tag of the current token layout
pub const TOKEN_VERSION: &str = "v1";

const SEPARATOR: char = ':';
const PART_COUNT: usize = 6;

/// Encrypts a file name with the default iteration count
pub fn encrypt_name(password: &str, name: &str) -> Result<String> {
    encrypt_name_with(password, name, &EncryptOptions::default())
}

/// Encrypts a file name, honouring salt/IV/iteration overrides
pub fn encrypt_name_with(password: &str, name: &str, options: &EncryptOptions) -> Result<String> {
    let iterations = options.iterations.unwrap_or(DEFAULT_ITERATIONS);
    let salt = options.salt.unwrap_or_else(cipher::random_bytes);
    let iv = options.iv.unwrap_or_else(cipher::random_bytes);

    let sealed = cipher::seal(password, &salt, &iv, iterations, name.as_bytes())?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    Ok([
        TOKEN_VERSION.to_string(),
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(tag),
        iterations.to_string(),
    ]
    .join(":"))
}

/// Decrypts a token produced by [`encrypt_name`]
///
/// # Errors
/// - [`CryptoError::InvalidToken`] for a wrong part count or format tag,
///   undecodable parts, a bad iteration count, or non-UTF-8 plaintext
/// - [`CryptoError::AuthenticationFailure`] for a wrong password or a
///   modified token
pub fn decrypt_name(password: &str, token: &str) -> Result<String> {
    let parts: Vec<&str> = token.split(SEPARATOR).collect();
    if parts.len() != PART_COUNT {
        return Err(CryptoError::InvalidToken(format!(
            "expected {PART_COUNT} parts, found {}",
            parts.len()
        )));
    }
    if parts[0] != TOKEN_VERSION {
        return Err(CryptoError::InvalidToken(format!(
            "unsupported format tag {:?}",
            parts[0]
        )));
    }

    let salt: [u8; SALT_LEN] = decode_fixed(parts[1], "salt")?;
    let iv: [u8; IV_LEN] = decode_fixed(parts[2], "iv")?;
    let ciphertext = decode(parts[3], "ciphertext")?;
    let tag: [u8; TAG_LEN] = decode_fixed(parts[4], "tag")?;
    let iterations: u32 = parts[5]
        .parse()
        .map_err(|_| CryptoError::InvalidToken(format!("bad iteration count {:?}", parts[5])))?;
    if iterations < MIN_ITERATIONS {
        return Err(CryptoError::InvalidToken(format!(
            "iteration count {iterations} is below the minimum of {MIN_ITERATIONS}"
        )));
    }

    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);
    let plaintext = cipher::open(password, &salt, &iv, iterations, &sealed)?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::InvalidToken("decrypted name is not UTF-8".to_string()))
}

fn decode(part: &str, what: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| CryptoError::InvalidToken(format!("{what} is not base64url: {e}")))
}

fn decode_fixed<const N: usize>(part: &str, what: &str) -> Result<[u8; N]> {
    let bytes = decode(part, what)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CryptoError::InvalidToken(format!("{what} must be {N} bytes, got {}", bytes.len()))
    })
}
