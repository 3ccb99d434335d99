//! `vaultx name` - encrypt and decrypt file-name tokens

use anyhow::Result;
use clap::Subcommand;

use vaultx_core::config::Config;
use vaultx_crypto::EncryptOptions;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum NameCommand {
    /// Turn a file name into a `v1:` token
    Encrypt {
        name: String,
        #[arg(long, env = "VAULTX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Recover the file name from a token
    Decrypt {
        token: String,
        #[arg(long, env = "VAULTX_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

impl NameCommand {
    /// Needs only the crypto settings, not the vault
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let iterations = config.crypto.iterations;
        let (json, text) = match self {
            NameCommand::Encrypt { name, password } => {
                let (name, password) = (name.clone(), password.clone());
                let token = tokio::task::spawn_blocking(move || {
                    vaultx_crypto::encrypt_name_with(
                        &password,
                        &name,
                        &EncryptOptions::with_iterations(iterations),
                    )
                })
                .await??;
                let json = serde_json::json!({ "token": token });
                (json, token)
            }
            NameCommand::Decrypt { token, password } => {
                let (token, password) = (token.clone(), password.clone());
                let name = tokio::task::spawn_blocking(move || {
                    vaultx_crypto::decrypt_name(&password, token.trim_end_matches(".enc"))
                })
                .await??;
                let json = serde_json::json!({ "name": name });
                (json, name)
            }
        };

        if format.is_json() {
            formatter.print_json(&json);
        } else {
            println!("{text}");
        }
        Ok(())
    }
}
