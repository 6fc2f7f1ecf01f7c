//! Time-bounded calls into external stores.
//!
//! Every credential or session store call goes through one of these
//! helpers so that no authentication step can block indefinitely. A
//! timeout surfaces as [`ErrorKind::Timeout`](crate::error::ErrorKind::Timeout),
//! which callers treat as an infrastructure failure, never as a failed login.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::AppError;
use crate::result::AppResult;

/// Time and retry limits applied to store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBounds {
    /// Maximum wall time for a single store call.
    pub timeout: Duration,
    /// Extra attempts allowed for idempotent reads.
    pub read_retries: u32,
    /// Base delay between read attempts (multiplied by the attempt number).
    pub backoff: Duration,
}

impl CallBounds {
    /// Builds bounds from the `store` configuration section.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.operation_timeout_ms),
            read_retries: config.read_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl Default for CallBounds {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

/// Awaits `fut`, failing with a timeout error once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(AppError::timeout(format!(
                "{operation} timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}

/// Runs an idempotent read, retrying retryable failures.
///
/// Each attempt is individually bounded by `bounds.timeout`.
pub async fn with_read_retry<T, F, Fut>(bounds: &CallBounds, operation: &str, mut f: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match with_timeout(bounds.timeout, operation, f()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < bounds.read_retries => {
                attempt += 1;
                debug!(operation, attempt, error = %e, "Retrying store read");
                tokio::time::sleep(bounds.backoff * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Runs a store mutation on its own task and waits for it up to `limit`.
///
/// The mutation is detached from the caller: if the caller is cancelled or
/// the wait times out, the spawned task still runs to completion, so a
/// conditional update is never abandoned halfway. Mutations are not retried.
pub async fn detached_write<T, F>(limit: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(fut);
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(AppError::with_source(
            crate::error::ErrorKind::Internal,
            format!("{operation} task failed"),
            join_err,
        )),
        Err(_) => {
            warn!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "Store mutation still running after timeout"
            );
            Err(AppError::timeout(format!(
                "{operation} timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use super::*;
    use crate::error::ErrorKind;

    fn bounds() -> CallBounds {
        CallBounds {
            timeout: Duration::from_millis(100),
            read_retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result: AppResult<()> = with_timeout(Duration::from_millis(10), "slow read", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("slow read"));
    }

    #[tokio::test]
    async fn test_read_retry_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let value = with_read_retry(&bounds(), "flaky read", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppError::database("connection reset"))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_retry_gives_up_after_limit() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = with_read_retry(&bounds(), "dead read", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::database("down")) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::Database);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_retry_skips_non_retryable() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = with_read_retry(&bounds(), "bad read", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::validation("bad input")) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::Validation);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_write_finishes_after_timeout() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();

        let result = detached_write(Duration::from_millis(10), "slow write", async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ErrorKind::Timeout);
        assert!(!done.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(done.load(Ordering::SeqCst));
    }
}
