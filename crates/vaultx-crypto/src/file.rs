//! Envelope encryption of whole files
//!
//! Inputs are read fully into memory; key derivation and the cipher run on
//! the blocking pool. Outputs are written to `<output>.tmp` and renamed into
//! place, so a crash never leaves a partial envelope or plaintext behind.

use std::path::Path;

use tracing::{debug, instrument};

use crate::envelope::{self, EncryptOptions};
use crate::{CryptoError, Result};

/// Encrypts `input` into an envelope at `output`
#[instrument(skip(password, options), fields(input = %input.display(), output = %output.display()))]
pub async fn encrypt_file(
    password: &str,
    input: &Path,
    output: &Path,
    options: &EncryptOptions,
) -> Result<()> {
    let plaintext = tokio::fs::read(input).await?;
    let password = password.to_string();
    let options = options.clone();
    let envelope = run_blocking(move || envelope::encrypt(&password, &plaintext, &options)).await?;
    write_atomic(output, &envelope).await?;
    debug!(bytes = envelope.len(), "file encrypted");
    Ok(())
}

/// Decrypts the envelope at `input` into `output`
///
/// Nothing is written when decryption fails.
#[instrument(skip(password), fields(input = %input.display(), output = %output.display()))]
pub async fn decrypt_file(password: &str, input: &Path, output: &Path) -> Result<()> {
    let envelope = tokio::fs::read(input).await?;
    let password = password.to_string();
    let plaintext = run_blocking(move || envelope::decrypt(&password, &envelope)).await?;
    write_atomic(output, &plaintext).await?;
    debug!(bytes = plaintext.len(), "file decrypted");
    Ok(())
}

async fn run_blocking<F>(op: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Result<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| CryptoError::Io(std::io::Error::other(e)))?
}

async fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        std::path::PathBuf::from(p)
    };

    tokio::fs::write(&tmp_path, data).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, target).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}
