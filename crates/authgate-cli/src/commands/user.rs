//! Account management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use authgate_core::config::AppConfig;
use authgate_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account
    Add {
        /// Username
        username: String,
        /// Grant the staff flag
        #[arg(long)]
        staff: bool,
        /// Grant the superuser flag
        #[arg(long)]
        superuser: bool,
        /// Create without a password; the account must reset before logging in
        #[arg(long)]
        no_password: bool,
    },
    /// Show an account
    Show {
        /// Username
        username: String,
    },
    /// Replace a password and revoke every session of the account
    SetPassword {
        /// Username
        username: String,
    },
    /// Issue a password-reset token
    ResetToken {
        /// Username
        username: String,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: i64,
    /// Username
    username: String,
    /// Status
    status: String,
    /// Staff
    staff: bool,
    /// Superuser
    superuser: bool,
    /// Last login
    last_login: String,
}

/// Reset token output
#[derive(Debug, Serialize)]
struct ResetTokenOutput<'a> {
    username: &'a str,
    token: &'a str,
    expires_at: String,
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = super::create_manager(config).await?;

    match &args.command {
        UserCommand::Add {
            username,
            staff,
            superuser,
            no_password,
        } => {
            let password = if *no_password {
                None
            } else {
                Some(prompt_password(username)?)
            };

            let user = manager
                .create_user(username, password.as_deref(), *staff, *superuser)
                .await?;
            output::print_success(&format!("User '{}' created with id {}", user.username, user.id));
            if user.requires_password_change() {
                output::print_warning("No password set; issue a reset token before first login.");
            }
        }
        UserCommand::Show { username } => {
            let user = manager
                .find_by_username(username)
                .await?
                .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;

            let status = if !user.is_active {
                "inactive"
            } else if user.requires_password_change() {
                "reset required"
            } else {
                "active"
            };
            let rows = [UserRow {
                id: user.id,
                username: user.username.clone(),
                status: status.to_string(),
                staff: user.is_staff,
                superuser: user.is_superuser,
                last_login: user
                    .last_login
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            }];
            output::print_list(&rows, format);
        }
        UserCommand::SetPassword { username } => {
            let password = prompt_password(username)?;
            let revoked = manager.set_password(username, &password).await?;
            output::print_success(&format!(
                "Password for '{username}' updated, {revoked} sessions revoked"
            ));
        }
        UserCommand::ResetToken { username } => {
            let issued = manager
                .password_reset(username)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;
            let expires_at = issued.expires_at.to_rfc3339();
            output::print_secret(
                &format!("Reset token for '{username}' (expires {expires_at})"),
                &issued.token,
                &ResetTokenOutput {
                    username,
                    token: &issued.token,
                    expires_at,
                },
                format,
            );
        }
    }

    Ok(())
}

fn prompt_password(username: &str) -> Result<String, AppError> {
    dialoguer::Password::new()
        .with_prompt(format!("Password for '{username}'"))
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
