//! CLI command definitions and dispatch.

pub mod keys;
pub mod migrate;
pub mod session;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use authgate_auth::AuthSessionManager;
use authgate_core::config::AppConfig;
use authgate_core::error::AppError;
use authgate_database::{CredentialRepository, DatabasePool, SessionRepository};

use crate::output::OutputFormat;

/// authgate: credential and token-session administration
#[derive(Debug, Parser)]
#[command(name = "authgate", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `default.toml` and environment overlays
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    /// Environment overlay to apply on top of the defaults
    #[arg(short, long, env = "AUTHGATE_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Account management
    User(user::UserArgs),
    /// Refresh and reset session management
    Session(session::SessionArgs),
    /// Signing key inspection
    Keys(keys::KeysArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load_from(&self.config_dir, &self.env)?;
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::User(args) => user::execute(args, &config, self.format).await,
            Commands::Session(args) => session::execute(args, &config, self.format).await,
            Commands::Keys(args) => keys::execute(args, &config),
        }
    }
}

/// Helper: connect to the database named in the configuration
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: build the authentication graph over PostgreSQL
pub async fn create_manager(config: &AppConfig) -> Result<AuthSessionManager, AppError> {
    let pool = create_db_pool(config).await?;
    AuthSessionManager::from_config(
        config,
        Arc::new(CredentialRepository::new(pool.pool().clone())),
        Arc::new(SessionRepository::new(pool.pool().clone())),
    )
}
