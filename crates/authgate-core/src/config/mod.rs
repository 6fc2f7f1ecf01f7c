//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod auth;
pub mod database;
pub mod logging;
pub mod session;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::auth::{AuthConfig, KdfConfig, SigningAlgorithm};
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::session::SessionConfig;
pub use self::store::StoreConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Credential hashing and token signing settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Refresh and reset session lifetimes.
    #[serde(default)]
    pub session: SessionConfig,
    /// Store call bounds.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default.toml` with an environment-specific overlay
    /// (`config/{env}.toml`) and environment variables prefixed with
    /// `AUTHGATE__` (e.g. `AUTHGATE__AUTH__JWT_SECRET`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config", env)
    }

    /// Same as [`AppConfig::load`] with an explicit configuration directory.
    pub fn load_from(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AUTHGATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
