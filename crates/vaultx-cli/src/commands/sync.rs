//! `vaultx sync` - one reconciliation pass against the remote API
//!
//! 1. Builds the HTTP transport from `remote` configuration
//! 2. Uses `--token`, or signs in with `--username`/`--password` to get one
//! 3. Runs a single `SyncReconciler` pass with that credential
//! 4. Prints the report

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use vaultx_core::domain::Credential;
use vaultx_remote::{ApiClient, HttpTransport};
use vaultx_sync::{SkipReason, SyncReconciler, SyncReport};

use crate::commands::user::remote_login;
use crate::context::AppContext;
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Bearer credential for the metadata API
    #[arg(long, env = "VAULTX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Sign in as this user instead of passing a token
    #[arg(long, env = "VAULTX_USERNAME", conflicts_with = "token", requires = "password")]
    pub username: Option<String>,
    #[arg(long, env = "VAULTX_LOGIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let client = ApiClient::from_config(&ctx.config.remote)?;
        info!(api_base = client.base_url(), "Using remote metadata API");
        let credential = self.credential(ctx, &client).await?;

        let transport = Arc::new(HttpTransport::new(client));
        let reconciler = SyncReconciler::new(
            ctx.store.clone(),
            transport,
            ctx.vault.clone(),
            ctx.audit.clone(),
        );

        if !format.is_json() && credential.is_some() {
            formatter.info("Starting synchronization...");
        }
        let report = reconciler.run_sync(credential.as_ref()).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
        } else {
            print_report(formatter.as_ref(), &report);
        }
        Ok(())
    }

    /// The explicit token, else a fresh session from the API, else none
    async fn credential(&self, ctx: &AppContext, client: &ApiClient) -> Result<Option<Credential>> {
        if let Some(token) = self.token.as_deref() {
            return Ok(Some(Credential::new(token)?));
        }
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) => {
                Ok(Some(remote_login(ctx, client, username, password).await?))
            }
            _ => Ok(None),
        }
    }
}

fn print_report(formatter: &dyn OutputFormatter, report: &SyncReport) {
    match report.skipped {
        Some(SkipReason::NoCredential) => {
            formatter.warn(
                "No credential supplied (use --token, or --username with --password); nothing synced",
            );
            return;
        }
        Some(SkipReason::AlreadySyncing) => {
            formatter.warn("A sync pass is already running");
            return;
        }
        None => {}
    }

    let duration = if report.duration_ms >= 1000 {
        format!("{:.1}s", report.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", report.duration_ms)
    };

    if report.downloaded.is_empty() && report.uploaded.is_empty() && report.failures.is_empty() {
        formatter.success("Already up to date");
    } else {
        formatter.success(&format!("Sync completed in {duration}"));
    }
    if !report.downloaded.is_empty() {
        formatter.info(&format!("Downloaded: {}", plural(report.downloaded.len(), "file")));
    }
    if !report.uploaded.is_empty() {
        formatter.info(&format!("Uploaded:   {}", plural(report.uploaded.len(), "file")));
    }
    if !report.failures.is_empty() {
        formatter.error(&format!("{} failed:", plural(report.failures.len(), "item")));
        for f in &report.failures {
            formatter.info(&format!("  - {} ({}): {}", f.file_id, f.direction.as_str(), f.message));
        }
    }
}
