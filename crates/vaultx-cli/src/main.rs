//! VaultX CLI - command-line interface for the encrypted file vault
//!
//! Provides commands for:
//! - Creating local accounts and signing in
//! - Encrypting files into the vault and decrypting them back
//! - Managing per-file permissions
//! - Viewing the audit log
//! - Reconciling with the remote metadata API
//! - Mirroring replica directories, once or continuously
//! - Encrypting and decrypting file-name tokens

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vaultx_core::config::Config;

mod commands;
mod context;
mod output;

use commands::{
    file::FileCommand, logs::LogsCommand, mirror::MirrorCommand, name::NameCommand,
    perm::PermCommand, sync::SyncCommand, user::{LoginCommand, UserCommand},
};
use context::AppContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "vaultx", version, about = "Encrypted file vault with sync and mirroring")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage local user accounts
    #[command(subcommand)]
    User(UserCommand),
    /// Verify a password, or obtain a remote session token
    Login(LoginCommand),
    /// Encrypt, decrypt, list and remove vault files
    #[command(subcommand)]
    File(FileCommand),
    /// Manage file permissions
    #[command(subcommand)]
    Perm(PermCommand),
    /// Show recent audit log entries
    Logs(LogsCommand),
    /// Reconcile the vault with the remote metadata API
    Sync(SyncCommand),
    /// Keep replica directories identical
    #[command(subcommand)]
    Mirror(MirrorCommand),
    /// Encrypt or decrypt a file-name token
    #[command(subcommand)]
    Name(NameCommand),
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()),
    };
    config.apply_env_overrides();

    let errors = config.validate();
    if !errors.is_empty() {
        let list: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Invalid configuration:\n  {}", list.join("\n  "));
    }
    Ok(config)
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let format = OutputFormat::from_flag(cli.json);

    if let Commands::Name(cmd) = &cli.command {
        return cmd.execute(&config, format).await;
    }

    let ctx = AppContext::open(config).await?;
    match &cli.command {
        Commands::User(cmd) => cmd.execute(&ctx, format).await,
        Commands::Login(cmd) => cmd.execute(&ctx, format).await,
        Commands::File(cmd) => cmd.execute(&ctx, format).await,
        Commands::Perm(cmd) => cmd.execute(&ctx, format).await,
        Commands::Logs(cmd) => cmd.execute(&ctx, format).await,
        Commands::Sync(cmd) => cmd.execute(&ctx, format).await,
        Commands::Mirror(cmd) => cmd.execute(&ctx, format).await,
        Commands::Name(_) => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let formatter = get_formatter(OutputFormat::from_flag(cli.json));

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            std::process::exit(2);
        }
    };
    init_tracing(&cli, &config);

    if let Err(e) = run(cli, config).await {
        formatter.error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "vaultx", "--json", "file", "upload", "notes.txt", "--owner", "alice", "--password",
            "pw",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::File(FileCommand::Upload { owner, .. }) => assert_eq!(owner.as_str(), "alice"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_perm_rejects_unknown_permission() {
        let result = Cli::try_parse_from(["vaultx", "perm", "grant", "f1", "bob", "admin"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_mirror_dirs() {
        let cli = Cli::try_parse_from([
            "vaultx", "mirror", "sync", "f1", "--dir", "/a", "--dir", "/b",
        ])
        .unwrap();
        match cli.command {
            Commands::Mirror(MirrorCommand::Sync { dirs, .. }) => assert_eq!(dirs.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_user_add_defaults_role() {
        let cli =
            Cli::try_parse_from(["vaultx", "user", "add", "alice", "--password", "pw"]).unwrap();
        match cli.command {
            Commands::User(UserCommand::Add { username, role, .. }) => {
                assert_eq!(username, "alice");
                assert_eq!(role, vaultx_core::domain::Role::User);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from([
            "vaultx", "user", "add", "bob", "--password", "pw", "--role", "root"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_sync_token_conflicts_with_username() {
        let result = Cli::try_parse_from([
            "vaultx", "sync", "--token", "t", "--username", "alice", "--password", "pw",
        ]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["vaultx", "sync", "--username", "alice", "--password", "pw"])
            .unwrap();
        match cli.command {
            Commands::Sync(cmd) => assert_eq!(cmd.username.as_deref(), Some("alice")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_logs_default_limit() {
        let cli = Cli::try_parse_from(["vaultx", "logs"]).unwrap();
        match cli.command {
            Commands::Logs(cmd) => assert_eq!(cmd.limit, 100),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "crypto:\n  iterations: 10\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
