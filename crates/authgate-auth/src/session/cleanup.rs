//! Periodic purge of expired session records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use authgate_core::config::SessionConfig;
use authgate_core::result::AppResult;

use super::store::SessionStore;

/// Background task that deletes expired records on a fixed interval.
#[derive(Debug, Clone)]
pub struct SessionCleanup {
    sessions: Arc<SessionStore>,
    interval: Duration,
}

impl SessionCleanup {
    /// Create a cleanup task using the configured interval.
    pub fn new(sessions: Arc<SessionStore>, config: &SessionConfig) -> Self {
        Self::with_interval(
            sessions,
            Duration::from_secs(config.cleanup_interval_minutes.saturating_mul(60)),
        )
    }

    /// Create a cleanup task with an explicit interval (at least one second).
    pub fn with_interval(sessions: Arc<SessionStore>, interval: Duration) -> Self {
        Self {
            sessions,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Interval between purges.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one purge
    pub async fn run_cleanup(&self) -> AppResult<u64> {
        let removed = self.sessions.purge_expired().await?;
        if removed > 0 {
            info!(removed = removed, "Expired sessions purged");
        } else {
            debug!("No expired sessions to purge");
        }
        Ok(removed)
    }

    /// Purge on every tick until `shutdown` flips to `true` or its sender
    /// is dropped. Failures are logged and the loop keeps going.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Session cleanup started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cleanup().await {
                        error!(error = %e, "Session cleanup failed");
                    }
                }
            }
        }

        info!("Session cleanup stopped");
    }
}
