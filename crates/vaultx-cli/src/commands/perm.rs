//! `vaultx perm` - grant, revoke and list file permissions

use anyhow::Result;
use clap::Subcommand;

use vaultx_core::domain::{FileId, Permission, PermissionGrant, UserId};

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum PermCommand {
    /// Grant a user read or write access
    Grant {
        file_id: FileId,
        user: UserId,
        permission: Permission,
        /// Acting user (defaults to the file owner)
        #[arg(long)]
        by: Option<UserId>,
    },
    /// Revoke a previously granted permission
    Revoke {
        file_id: FileId,
        user: UserId,
        permission: Permission,
        #[arg(long)]
        by: Option<UserId>,
    },
    /// List the grants on a file
    Ls { file_id: FileId },
}

impl PermCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        match self {
            PermCommand::Grant {
                file_id,
                user,
                permission,
                by,
            } => {
                let grant = PermissionGrant::new(file_id.clone(), user.clone(), *permission);
                let actor = change(ctx, &grant, by.as_ref(), true).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&grant)?);
                } else {
                    formatter.success(&format!(
                        "{actor} granted {} on {file_id} to {user}",
                        permission.as_str()
                    ));
                }
            }
            PermCommand::Revoke {
                file_id,
                user,
                permission,
                by,
            } => {
                let grant = PermissionGrant::new(file_id.clone(), user.clone(), *permission);
                let actor = change(ctx, &grant, by.as_ref(), false).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&grant)?);
                } else {
                    formatter.success(&format!(
                        "{actor} revoked {} on {file_id} from {user}",
                        permission.as_str()
                    ));
                }
            }
            PermCommand::Ls { file_id } => {
                ctx.require_file(file_id).await?;
                let grants = ctx.store.list_permissions(file_id).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&grants)?);
                } else if grants.is_empty() {
                    formatter.info("No grants.");
                } else {
                    for g in &grants {
                        formatter.info(&format!("{:<6} {}", g.permission.as_str(), g.user_id));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Applies a grant or revoke as the owner (or `by`) and audits it
async fn change(
    ctx: &AppContext,
    grant: &PermissionGrant,
    by: Option<&UserId>,
    granting: bool,
) -> Result<UserId> {
    let record = ctx.require_file(&grant.file_id).await?;
    let actor = by.unwrap_or(record.owner_id()).clone();
    ctx.require_owner(&actor, &record)?;

    if granting {
        ctx.store.grant_permission(grant).await?;
        ctx.audit.log_grant(&actor, grant).await;
    } else {
        ctx.store.revoke_permission(grant).await?;
        ctx.audit.log_revoke(&actor, grant).await;
    }
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use vaultx_core::domain::{AuditAction, FileRecord};

    use super::*;
    use crate::context::test_support::temp_context;

    fn user(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_grant_then_revoke() {
        let (_tmp, ctx) = temp_context().await;
        let record = FileRecord::new(FileId::generate(), "a.txt", "a.enc", user("alice")).unwrap();
        ctx.store.upsert_file_record(&record).await.unwrap();
        let grant = PermissionGrant::new(record.id().clone(), user("bob"), Permission::Write);

        let actor = change(&ctx, &grant, None, true).await.unwrap();
        assert_eq!(actor, user("alice"));
        assert_eq!(ctx.store.list_permissions(record.id()).await.unwrap(), vec![grant.clone()]);

        change(&ctx, &grant, None, false).await.unwrap();
        assert!(ctx.store.list_permissions(record.id()).await.unwrap().is_empty());

        let actions: Vec<_> = ctx
            .store
            .recent_audit(10)
            .await
            .unwrap()
            .iter()
            .map(|e| e.action())
            .collect();
        assert!(actions.contains(&AuditAction::Grant));
        assert!(actions.contains(&AuditAction::Revoke));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_grant() {
        let (_tmp, ctx) = temp_context().await;
        let record = FileRecord::new(FileId::generate(), "a.txt", "a.enc", user("alice")).unwrap();
        ctx.store.upsert_file_record(&record).await.unwrap();
        let grant = PermissionGrant::new(record.id().clone(), user("carol"), Permission::Read);

        assert!(change(&ctx, &grant, Some(&user("bob")), true).await.is_err());
        assert!(ctx.store.list_permissions(record.id()).await.unwrap().is_empty());
    }
}
