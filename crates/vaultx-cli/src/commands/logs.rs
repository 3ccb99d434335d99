//! `vaultx logs` - recent audit entries

use anyhow::{Context, Result};
use clap::Args;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct LogsCommand {
    /// Maximum number of entries, newest first
    #[arg(long, default_value = "100")]
    pub limit: u32,
}

impl LogsCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let entries = ctx
            .store
            .recent_audit(self.limit)
            .await
            .context("Failed to query audit entries")?;

        if format.is_json() {
            let entries: Vec<serde_json::Value> = entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "id": e.id(),
                        "timestamp": e.timestamp().to_rfc3339(),
                        "user": e.user_id(),
                        "action": e.action(),
                        "fileId": e.file_id(),
                        "details": e.details(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "limit": self.limit,
                "count": entries.len(),
                "entries": entries,
            }));
            return Ok(());
        }

        if entries.is_empty() {
            formatter.info("No audit entries.");
            return Ok(());
        }

        formatter.info(&format!(
            "{:<20} {:<14} {:<12} {}",
            "TIMESTAMP", "ACTION", "USER", "FILE"
        ));
        for e in &entries {
            formatter.info(&format!(
                "{:<20} {:<14} {:<12} {}",
                e.timestamp().format("%Y-%m-%d %H:%M:%S"),
                e.action().as_str(),
                e.user_id(),
                e.file_id().map(|id| id.as_str()).unwrap_or("-"),
            ));
        }
        Ok(())
    }
}
