//! `vaultx mirror` - keep replica directories identical
//!
//! `mirror sync` reconciles one file once; `mirror watch` runs the watch
//! loop until Ctrl-C, printing each event as it arrives.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Subcommand;
use tracing::info;

use vaultx_core::domain::FileId;
use vaultx_sync::{DirectoryMirror, MirrorEvent, MirrorWatcher, WatchOptions};

use crate::context::AppContext;
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum MirrorCommand {
    /// Copy the newest version of one file into every replica
    Sync {
        file_id: FileId,
        /// Replica directory (repeatable; defaults to `mirror.directories`)
        #[arg(long = "dir")]
        dirs: Vec<PathBuf>,
    },
    /// Watch the replicas and mirror changes until interrupted
    Watch {
        #[arg(long = "dir")]
        dirs: Vec<PathBuf>,
    },
}

impl MirrorCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        match self {
            MirrorCommand::Sync { file_id, dirs } => {
                let mirror = build_mirror(ctx, dirs)?;
                let outcome = mirror.sync_file_by_id(file_id).await?;
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&outcome)?);
                } else if outcome.updated == 0 {
                    formatter.success("All replicas are current");
                } else {
                    formatter.success(&format!(
                        "Updated {}",
                        plural(outcome.updated, "replica")
                    ));
                }
            }
            MirrorCommand::Watch { dirs } => {
                let mirror = Arc::new(build_mirror(ctx, dirs)?);
                let options = WatchOptions::from(&ctx.config.mirror);
                let (watcher, mut events) = MirrorWatcher::start(mirror.clone(), options)?;

                formatter.success(&format!(
                    "Watching {} directories (Ctrl-C to stop)",
                    mirror.directories().len()
                ));

                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            info!("Interrupted");
                            break;
                        }
                        event = events.recv() => match event {
                            Some(event) => print_event(formatter.as_ref(), format, &event)?,
                            None => break,
                        },
                    }
                }
                watcher.stop().await;
            }
        }
        Ok(())
    }
}

fn build_mirror(ctx: &AppContext, dirs: &[PathBuf]) -> Result<DirectoryMirror> {
    let dirs = if dirs.is_empty() {
        ctx.config.mirror.directories.clone()
    } else {
        dirs.to_vec()
    };
    if dirs.len() < 2 {
        bail!("Mirroring needs at least two directories (use --dir or mirror.directories)");
    }
    Ok(DirectoryMirror::new(ctx.store.clone(), ctx.audit.clone(), dirs))
}

fn print_event(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    event: &MirrorEvent,
) -> Result<()> {
    if format.is_json() {
        formatter.print_json(&serde_json::to_value(event)?);
        return Ok(());
    }
    match event {
        MirrorEvent::Synced { outcome, .. } if outcome.updated > 0 => formatter.success(
            &format!("{} -> {}", outcome.file_id, plural(outcome.updated, "replica")),
        ),
        MirrorEvent::Synced { file, .. } => {
            tracing::debug!(file = %file, "Replicas already current");
        }
        MirrorEvent::Error { file, error } => formatter.error(&format!("{file}: {error}")),
    }
    Ok(())
}
