//! Session management CLI commands.

use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use authgate_core::config::AppConfig;
use authgate_core::error::AppError;
use authgate_database::SessionState;

use crate::output::{self, OutputFormat};

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// List a user's session records
    List {
        /// Username
        username: String,
    },
    /// Revoke every session of a user
    Revoke {
        /// Username
        username: String,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Delete expired records now
    Purge,
}

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Purpose
    purpose: String,
    /// State
    state: String,
    /// Created
    created: String,
    /// Expires
    expires: String,
    /// Redeemed
    redeemed: String,
}

/// Execute session commands
pub async fn execute(
    args: &SessionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = super::create_manager(config).await?;

    match &args.command {
        SessionCommand::List { username } => {
            let user = manager
                .find_by_username(username)
                .await?
                .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;

            let now = Utc::now();
            let rows: Vec<SessionRow> = manager
                .sessions()
                .list_for_user(user.id)
                .await?
                .iter()
                .map(|s| SessionRow {
                    purpose: s.purpose.to_string(),
                    state: match s.state_at(now) {
                        SessionState::Valid => "valid",
                        SessionState::Redeemed => "redeemed",
                        SessionState::Expired => "expired",
                    }
                    .to_string(),
                    created: s.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    expires: s.expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    redeemed: s
                        .redeemed_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                })
                .collect();

            output::print_list(&rows, format);
        }
        SessionCommand::Revoke { username, force } => {
            let user = manager
                .find_by_username(username)
                .await?
                .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;

            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Revoke ALL sessions of '{username}'?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let count = manager.sessions().invalidate_all(user.id).await?;
            output::print_success(&format!("Revoked {count} sessions"));
        }
        SessionCommand::Purge => {
            let count = manager.sessions().purge_expired().await?;
            output::print_success(&format!("Purged {count} expired sessions"));
        }
    }

    Ok(())
}
