//! `vaultx user` and `vaultx login` - local accounts and sign-in
//!
//! Accounts live in the metadata database with bcrypt password hashes.
//! `login` checks a password against the local account, or with `--remote`
//! exchanges it at the metadata API for a session token usable by `sync`.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use tracing::{info, warn};

use vaultx_core::domain::{Credential, Role, UserAccount, UserId};
use vaultx_crypto::{hash_password_async, verify_password_async};
use vaultx_remote::ApiClient;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a local account
    Add {
        username: String,
        #[arg(long, env = "VAULTX_LOGIN_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
}

impl UserCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        match self {
            UserCommand::Add {
                username,
                password,
                role,
            } => {
                let account = add_user(ctx, username, password, *role).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "username": account.username(),
                        "role": account.role(),
                        "createdAt": account.created_at(),
                    }));
                } else {
                    formatter.success(&format!(
                        "User created: {} ({})",
                        account.username(),
                        account.role()
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LoginCommand {
    pub username: String,
    #[arg(long, env = "VAULTX_LOGIN_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Sign in at the remote metadata API and print the session token
    #[arg(long)]
    pub remote: bool,
}

impl LoginCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if self.remote {
            let client = ApiClient::from_config(&ctx.config.remote)?;
            let credential = remote_login(ctx, &client, &self.username, &self.password).await?;
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "username": self.username,
                    "token": credential.expose(),
                }));
            } else {
                formatter.success("Login successful");
                formatter.field("token", credential.expose());
                formatter.info("Export it as VAULTX_TOKEN to reuse it for `vaultx sync`.");
            }
            return Ok(());
        }

        let account = login(ctx, &self.username, &self.password).await?;
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "username": account.username(),
                "role": account.role(),
            }));
        } else {
            formatter.success("Login successful");
        }
        Ok(())
    }
}

/// Hashes the password and registers a new account
pub(crate) async fn add_user(
    ctx: &AppContext,
    username: &str,
    password: &str,
    role: Role,
) -> Result<UserAccount> {
    let hash = hash_password_async(password, ctx.config.crypto.password_cost).await?;
    let account = UserAccount::new(username, hash, role)?;
    ctx.store.add_user(&account).await?;
    ctx.audit.log_user_add(&account).await;
    info!(username, role = %role, "User created");
    Ok(account)
}

/// Verifies a password against the local account
///
/// Unknown users and wrong passwords fail with the same message.
pub(crate) async fn login(ctx: &AppContext, username: &str, password: &str) -> Result<UserAccount> {
    let Some(account) = ctx.store.get_user(username).await? else {
        warn!(username, "Login failed: unknown user");
        bail!("Invalid credentials");
    };
    if !verify_password_async(password, account.password_hash()).await? {
        warn!(username, "Login failed: wrong password");
        bail!("Invalid credentials");
    }
    ctx.audit.log_login(account.id(), false).await;
    Ok(account)
}

/// Exchanges the password for a session credential at the metadata API
pub(crate) async fn remote_login(
    ctx: &AppContext,
    client: &ApiClient,
    username: &str,
    password: &str,
) -> Result<Credential> {
    let credential = client.login(username, password).await?;
    let user = UserId::new(username.to_string())?;
    ctx.audit.log_login(&user, true).await;
    Ok(credential)
}
