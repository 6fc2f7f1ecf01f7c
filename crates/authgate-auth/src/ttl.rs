//! Lifetimes read from configuration.

use chrono::{Duration, Utc};

use authgate_core::error::AppError;
use authgate_core::result::AppResult;

/// Seconds per minute.
pub(crate) const MINUTE: i64 = 60;

/// Seconds per day.
pub(crate) const DAY: i64 = 24 * 60 * MINUTE;

/// Converts a configured count of `unit_secs` into a positive duration.
///
/// Zero and values that would push an expiry past the representable date
/// range are configuration errors.
pub(crate) fn configured_ttl(key: &str, value: u64, unit_secs: i64) -> AppResult<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(|v| v.checked_mul(unit_secs))
        .and_then(Duration::try_seconds)
        .filter(|ttl| *ttl > Duration::zero() && Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| AppError::configuration(format!("{key} is out of range: {value}")))
}
