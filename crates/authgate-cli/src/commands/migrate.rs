//! Database migration management commands.

use clap::{Args, Subcommand};

use authgate_core::config::AppConfig;
use authgate_core::error::AppError;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Check that the database is reachable
    Check,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            authgate_database::migration::run_migrations(pool.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Check => {
            if pool.health_check().await? {
                output::print_success("Database reachable.");
            } else {
                output::print_warning("Database answered unexpectedly.");
            }
        }
    }

    pool.close().await;
    Ok(())
}
