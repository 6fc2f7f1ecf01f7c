//! Refresh and reset session records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use authgate_core::AppError;
use authgate_core::types::UserId;

/// What a session token may be redeemed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionPurpose {
    /// Long-lived token minting a new access/refresh pair.
    Refresh,
    /// Short-lived token authorising a single password change.
    PasswordReset,
}

impl SessionPurpose {
    /// Return the purpose as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for SessionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionPurpose {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "refresh" => Ok(Self::Refresh),
            "password_reset" | "reset" => Ok(Self::PasswordReset),
            _ => Err(AppError::validation(format!(
                "Invalid session purpose: '{s}'. Expected one of: refresh, password_reset"
            ))),
        }
    }
}

/// Lifecycle state of a record as observed at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Redeemable.
    Valid,
    /// Already redeemed; any further presentation is a replay.
    Redeemed,
    /// Past its expiry while still marked valid.
    Expired,
}

/// A persisted refresh or password-reset token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    /// Opaque token string (primary key).
    #[serde(skip_serializing)]
    pub token: String,
    /// Owning user.
    pub user_id: UserId,
    /// What the token may be redeemed for.
    pub purpose: SessionPurpose,
    /// Cleared exactly once, at redemption.
    pub valid: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// When the token was redeemed.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Build a fresh, valid record.
    pub fn new(
        token: String,
        user_id: UserId,
        purpose: SessionPurpose,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            token,
            user_id,
            purpose,
            valid: true,
            created_at,
            expires_at: created_at + ttl,
            redeemed_at: None,
        }
    }

    /// A record expires at `expires_at` itself, not one tick later.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the record would pass the conditional redeem at `now`.
    pub fn is_redeemable_by(
        &self,
        user_id: UserId,
        purpose: SessionPurpose,
        now: DateTime<Utc>,
    ) -> bool {
        self.valid && self.user_id == user_id && self.purpose == purpose && !self.is_expired_at(now)
    }

    /// Current state of the record.
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if !self.valid {
            SessionState::Redeemed
        } else if self.is_expired_at(now) {
            SessionState::Expired
        } else {
            SessionState::Valid
        }
    }
}
