//! External store call bounds.

use serde::{Deserialize, Serialize};

/// Limits applied to every call into the credential and session stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum time a single store call may take, in milliseconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
    /// Additional attempts for idempotent reads. Writes are never retried.
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,
    /// Base backoff between read attempts, in milliseconds.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout(),
            read_retries: default_read_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

fn default_operation_timeout() -> u64 {
    5000
}

fn default_read_retries() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    50
}
