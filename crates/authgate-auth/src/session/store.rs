//! Refresh and password-reset session records with one-time redemption.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use authgate_core::bounded::{CallBounds, detached_write, with_read_retry};
use authgate_core::config::SessionConfig;
use authgate_core::result::AppResult;
use authgate_core::types::UserId;
use authgate_database::{SessionBackend, SessionPurpose, SessionRecord};

use crate::ttl::{DAY, MINUTE, configured_ttl};

/// Bytes of CSPRNG output per session token.
pub const TOKEN_BYTES: usize = 32;

/// Result of presenting a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemOutcome {
    /// The token was valid and has now been consumed.
    Authorized,
    /// The token is gone or expired. Routine; no further action.
    ReLoginRequired,
    /// The token was already consumed, or presented for the wrong user or
    /// purpose. The caller must revoke every session of the owner.
    HijackSuspected {
        /// Owner recorded on the token.
        owner: UserId,
    },
}

/// A newly created session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    /// Opaque token string.
    pub token: String,
    /// Expiry of the record.
    pub expires_at: DateTime<Utc>,
}

/// Owns every mutation of session records.
#[derive(Debug, Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    bounds: CallBounds,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl SessionStore {
    /// Creates a new session store. Fails on an out-of-range lifetime.
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        config: &SessionConfig,
        bounds: CallBounds,
    ) -> AppResult<Self> {
        Ok(Self {
            backend,
            bounds,
            refresh_ttl: configured_ttl("session.refresh_ttl_days", config.refresh_ttl_days, DAY)?,
            reset_ttl: configured_ttl(
                "session.reset_ttl_minutes",
                config.reset_ttl_minutes,
                MINUTE,
            )?,
        })
    }

    /// Lifetime of a record with the given purpose.
    pub fn ttl_for(&self, purpose: SessionPurpose) -> Duration {
        match purpose {
            SessionPurpose::Refresh => self.refresh_ttl,
            SessionPurpose::PasswordReset => self.reset_ttl,
        }
    }

    /// Stores a fresh valid record and returns its token.
    pub async fn create(&self, user_id: UserId, purpose: SessionPurpose) -> AppResult<IssuedSession> {
        let record = SessionRecord::new(
            generate_token(),
            user_id,
            purpose,
            Utc::now(),
            self.ttl_for(purpose),
        );
        let issued = IssuedSession {
            token: record.token.clone(),
            expires_at: record.expires_at,
        };

        let backend = self.backend.clone();
        detached_write(self.bounds.timeout, "session create", async move {
            backend.insert(&record).await
        })
        .await?;

        debug!(user_id = %user_id, purpose = %purpose, "Session created");
        Ok(issued)
    }

    /// Consumes a token if it is valid for `user_id` and `purpose`.
    ///
    /// The conditional update runs first; the record is only read when the
    /// update did not apply, to decide which failure it was. The update is
    /// never retried.
    pub async fn redeem(
        &self,
        token: &str,
        user_id: UserId,
        purpose: SessionPurpose,
    ) -> AppResult<RedeemOutcome> {
        let now = Utc::now();

        let backend = self.backend.clone();
        let owned_token = token.to_string();
        let redeemed = detached_write(self.bounds.timeout, "session redeem", async move {
            backend
                .mark_redeemed(&owned_token, user_id, purpose, now)
                .await
        })
        .await?;

        if redeemed {
            debug!(user_id = %user_id, purpose = %purpose, "Session redeemed");
            return Ok(RedeemOutcome::Authorized);
        }

        let record =
            with_read_retry(&self.bounds, "session lookup", || self.backend.find(token)).await?;
        let outcome = classify(record.as_ref(), user_id, purpose, now);

        match outcome {
            RedeemOutcome::HijackSuspected { owner } => warn!(
                user_id = %user_id,
                owner = %owner,
                purpose = %purpose,
                "Session token replayed or presented out of context"
            ),
            RedeemOutcome::ReLoginRequired => {
                debug!(user_id = %user_id, purpose = %purpose, "Session token unknown or expired")
            }
            RedeemOutcome::Authorized => {}
        }
        Ok(outcome)
    }

    /// Deletes every record of a user. Returns the count removed.
    pub async fn invalidate_all(&self, user_id: UserId) -> AppResult<u64> {
        let backend = self.backend.clone();
        let removed = detached_write(self.bounds.timeout, "session invalidate all", async move {
            backend.delete_by_user(user_id).await
        })
        .await?;

        info!(user_id = %user_id, removed = removed, "All sessions invalidated");
        Ok(removed)
    }

    /// Deletes one record. Returns whether it existed.
    pub async fn invalidate_one(&self, token: &str) -> AppResult<bool> {
        let backend = self.backend.clone();
        let owned_token = token.to_string();
        detached_write(self.bounds.timeout, "session invalidate", async move {
            backend.delete(&owned_token).await
        })
        .await
    }

    /// Deletes every expired record, redeemed or not. Returns the count.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let backend = self.backend.clone();
        let now = Utc::now();
        detached_write(self.bounds.timeout, "session purge", async move {
            backend.delete_expired(now).await
        })
        .await
    }

    /// Lists a user's records, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<SessionRecord>> {
        with_read_retry(&self.bounds, "session list", || {
            self.backend.list_by_user(user_id)
        })
        .await
    }

    /// Counts a user's records that could still be redeemed.
    pub async fn count_active(&self, user_id: UserId) -> AppResult<u64> {
        let now = Utc::now();
        with_read_retry(&self.bounds, "session count", || {
            self.backend.count_valid_by_user(user_id, now)
        })
        .await
    }
}

/// Decides why a token that failed the conditional update was refused.
fn classify(
    record: Option<&SessionRecord>,
    user_id: UserId,
    purpose: SessionPurpose,
    now: DateTime<Utc>,
) -> RedeemOutcome {
    let Some(record) = record else {
        return RedeemOutcome::ReLoginRequired;
    };

    if record.user_id != user_id || record.purpose != purpose || !record.valid {
        return RedeemOutcome::HijackSuspected {
            owner: record.user_id,
        };
    }

    if !record.is_expired_at(now) {
        // The update can only miss a valid, matching, live record if the
        // record changed between the two statements.
        warn!(user_id = %user_id, "Session changed during redemption");
    }
    RedeemOutcome::ReLoginRequired
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}
