//! Signing key inspection commands.

use clap::{Args, Subcommand};

use authgate_auth::TokenSigner;
use authgate_core::config::AppConfig;
use authgate_core::error::AppError;

use crate::output;

/// Arguments for key commands
#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Key subcommand
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Key subcommands
#[derive(Debug, Subcommand)]
pub enum KeysCommand {
    /// Load the configured keys and run a sign/verify check
    Check,
    /// Print the RS256 verification key
    Public,
}

/// Execute key commands
pub fn execute(args: &KeysArgs, config: &AppConfig) -> Result<(), AppError> {
    let signer = TokenSigner::from_config(&config.auth)?;

    match &args.command {
        KeysCommand::Check => {
            output::print_success("Signing keys loaded and verified.");
            output::print_kv("Algorithm", signer.algorithm().as_str());
            output::print_kv(
                "Access token TTL",
                &format!("{} minutes", config.auth.access_ttl_minutes),
            );
        }
        KeysCommand::Public => match signer.public_key_pem() {
            Some(pem) => print!("{pem}"),
            None => {
                return Err(AppError::validation(format!(
                    "{} uses a shared secret; there is no public key",
                    signer.algorithm()
                )));
            }
        },
    }

    Ok(())
}
