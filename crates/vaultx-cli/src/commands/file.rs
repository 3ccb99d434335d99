//! `vaultx file` - encrypt, register, decrypt and remove vault files

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use tracing::info;

use vaultx_core::domain::{FileId, FileRecord, UserId};
use vaultx_crypto::{EncryptOptions, EnvelopeHeader};

use crate::context::AppContext;
use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Encrypt a file into the vault and register it
    Upload {
        path: PathBuf,
        #[arg(long)]
        owner: UserId,
        #[arg(long, env = "VAULTX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Decrypt a vault file
    Download {
        id: FileId,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, env = "VAULTX_PASSWORD", hide_env_values = true)]
        password: String,
        /// Acting user; must own or hold a grant on the file
        #[arg(long)]
        user: Option<UserId>,
    },
    /// List files, optionally only those a user can access
    Ls {
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Show a file record and its envelope header
    Info { id: FileId },
    /// Delete a file record and its blob
    Rm {
        id: FileId,
        /// Acting user; must own the file
        #[arg(long)]
        user: Option<UserId>,
    },
}

impl FileCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        match self {
            FileCommand::Upload {
                path,
                owner,
                password,
            } => {
                let record = upload(ctx, path, owner, password).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&record)?);
                } else {
                    formatter.success(&format!("Uploaded {}", record.original_name()));
                    formatter.field("id", record.id().as_str());
                    formatter.field("blob", record.encrypted_name());
                }
            }
            FileCommand::Download {
                id,
                out,
                password,
                user,
            } => {
                let record = download(ctx, id, out, password, user.as_ref()).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "id": record.id(),
                        "output": out.display().to_string(),
                    }));
                } else {
                    formatter.success(&format!(
                        "Decrypted {} to {}",
                        record.original_name(),
                        out.display()
                    ));
                }
            }
            FileCommand::Ls { user } => {
                let records = match user {
                    Some(user) => ctx.store.list_files_accessible_by(user).await?,
                    None => ctx.store.get_file_records().await?,
                };
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&records)?);
                } else if records.is_empty() {
                    formatter.info("No files.");
                } else {
                    formatter.success(&plural(records.len(), "file"));
                    for r in &records {
                        formatter.info(&format!(
                            "{}  v{:<3} {}  {}",
                            r.id(),
                            r.version(),
                            r.last_modified_utc().format("%Y-%m-%d %H:%M:%S"),
                            r.original_name()
                        ));
                    }
                }
            }
            FileCommand::Info { id } => {
                let record = ctx.require_file(id).await?;
                let header = envelope_header(ctx, &record).await;
                if format.is_json() {
                    let mut value = serde_json::to_value(&record)?;
                    value["envelope"] = match &header {
                        Ok(h) => serde_json::json!({
                            "iterations": h.iterations,
                            "saltLen": h.salt.len(),
                            "ivLen": h.iv.len(),
                            "ciphertextLen": h.ciphertext_len,
                        }),
                        Err(e) => serde_json::json!({ "error": format!("{e:#}") }),
                    };
                    formatter.print_json(&value);
                } else {
                    formatter.success(record.original_name());
                    formatter.field("id", record.id().as_str());
                    formatter.field("owner", record.owner_id().as_str());
                    formatter.field("version", &record.version().to_string());
                    formatter.field("created", &record.created_at().to_rfc3339());
                    formatter.field("modified", &record.last_modified_utc().to_rfc3339());
                    formatter.field("blob", record.encrypted_name());
                    formatter.field("remote", record.storage_path().unwrap_or("-"));
                    match header {
                        Ok(h) => {
                            formatter.field("iterations", &h.iterations.to_string());
                            formatter.field("ciphertext", &format!("{} bytes", h.ciphertext_len));
                        }
                        Err(e) => formatter.warn(&format!("Cannot read envelope: {e:#}")),
                    }
                }
            }
            FileCommand::Rm { id, user } => {
                let record = remove(ctx, id, user.as_ref()).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({ "deleted": record.id() }));
                } else {
                    formatter.success(&format!("Deleted {}", record.original_name()));
                }
            }
        }
        Ok(())
    }
}

/// Encrypts `path` into the vault under a name token and registers it
pub(crate) async fn upload(
    ctx: &AppContext,
    path: &Path,
    owner: &UserId,
    password: &str,
) -> Result<FileRecord> {
    let original_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    let options = EncryptOptions::with_iterations(ctx.config.crypto.iterations);

    let token = {
        let password = password.to_string();
        let name = original_name.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || {
            vaultx_crypto::encrypt_name_with(&password, &name, &options)
        })
        .await??
    };
    let encrypted_name = format!("{token}.enc");

    let target = ctx.vault.path(&encrypted_name)?;
    vaultx_crypto::encrypt_file(password, path, &target, &options)
        .await
        .with_context(|| format!("Failed to encrypt {}", path.display()))?;

    let record = FileRecord::new(FileId::generate(), original_name, encrypted_name, owner.clone())?;
    ctx.store.upsert_file_record(&record).await?;
    ctx.audit.log_upload(&record).await;
    info!(file_id = %record.id(), "File registered");
    Ok(record)
}

/// Decrypts the vault blob of `id` into `out`
pub(crate) async fn download(
    ctx: &AppContext,
    id: &FileId,
    out: &Path,
    password: &str,
    user: Option<&UserId>,
) -> Result<FileRecord> {
    let record = ctx.require_file(id).await?;
    let reader = user.unwrap_or(record.owner_id()).clone();
    ctx.require_access(&reader, &record).await?;

    let source = ctx.vault.path(record.encrypted_name())?;
    vaultx_crypto::decrypt_file(password, &source, out)
        .await
        .with_context(|| format!("Failed to decrypt {}", record.original_name()))?;

    ctx.audit.log_download(&reader, &record).await;
    Ok(record)
}

/// Deletes the record of `id` and its vault blob
pub(crate) async fn remove(
    ctx: &AppContext,
    id: &FileId,
    user: Option<&UserId>,
) -> Result<FileRecord> {
    let record = ctx.require_file(id).await?;
    let actor = user.unwrap_or(record.owner_id()).clone();
    ctx.require_owner(&actor, &record)?;

    ctx.store.delete_file_record(record.id()).await?;
    if !ctx.vault.remove(record.encrypted_name()).await? {
        info!(blob = record.encrypted_name(), "Blob was already absent");
    }
    ctx.audit.log_delete(&actor, &record).await;
    Ok(record)
}

async fn envelope_header(ctx: &AppContext, record: &FileRecord) -> Result<EnvelopeHeader> {
    let bytes = ctx.vault.read(record.encrypted_name()).await?;
    Ok(vaultx_crypto::inspect(&bytes)?)
}
