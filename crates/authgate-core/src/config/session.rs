//! Session lifetime configuration.

use serde::{Deserialize, Serialize};

/// Refresh/reset session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a refresh session in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Lifetime of a password-reset session in minutes.
    #[serde(default = "default_reset_ttl")]
    pub reset_ttl_minutes: u64,
    /// Interval between expired-session purges, in minutes.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_ttl_days: default_refresh_ttl(),
            reset_ttl_minutes: default_reset_ttl(),
            cleanup_interval_minutes: default_cleanup_interval(),
        }
    }
}

fn default_refresh_ttl() -> u64 {
    30
}

fn default_reset_ttl() -> u64 {
    5
}

fn default_cleanup_interval() -> u64 {
    15
}
