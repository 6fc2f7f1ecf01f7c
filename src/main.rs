//! authgate server
//!
//! Wires configuration, storage and the authentication core together and
//! keeps expired sessions purged until shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use authgate_auth::{AuthSessionManager, SessionCleanup};
use authgate_core::config::AppConfig;
use authgate_core::error::AppError;
use authgate_database::{CredentialRepository, DatabasePool, SessionRepository};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let dir = std::env::var("AUTHGATE_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let env = std::env::var("AUTHGATE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load_from(&dir, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting authgate");

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    authgate_database::migration::run_migrations(db_pool.pool()).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Authentication core ──────────────────────────────
    let manager = AuthSessionManager::from_config(
        &config,
        Arc::new(CredentialRepository::new(db_pool.pool().clone())),
        Arc::new(SessionRepository::new(db_pool.pool().clone())),
    )?;
    tracing::info!(
        algorithm = %manager.signer().algorithm(),
        access_ttl_minutes = config.auth.access_ttl_minutes,
        refresh_ttl_days = config.session.refresh_ttl_days,
        "Authentication core ready"
    );

    // ── Step 3: Background session cleanup ───────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cleanup = SessionCleanup::new(manager.sessions().clone(), &config.session);
    let cleanup_handle = tokio::spawn(async move { cleanup.run(shutdown_rx).await });

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await?;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Err(e) = cleanup_handle.await {
        tracing::warn!(error = %e, "Session cleanup task ended abnormally");
    }

    db_pool.close().await;
    tracing::info!("authgate shut down complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() -> Result<(), AppError> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = ctrl_c => result?,
        _ = terminate => {},
    }
    Ok(())
}
