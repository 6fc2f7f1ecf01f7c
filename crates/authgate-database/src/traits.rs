//! Store interfaces consumed by the authentication core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use authgate_core::result::AppResult;
use authgate_core::types::UserId;

use crate::models::{Credential, NewCredential, ProfileUpdate, SessionPurpose, SessionRecord};

/// Durable credential store, keyed by unique username and id.
///
/// Implementations must be thread-safe and handle concurrent access.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Looks up a credential by exact username.
    async fn get_credential(&self, username: &str) -> AppResult<Option<Credential>>;

    /// Looks up a credential by id.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<Credential>>;

    /// Inserts a new credential. A taken username is a `Conflict`.
    async fn create(&self, data: &NewCredential) -> AppResult<Credential>;

    /// Replaces the stored digest. An unknown id is `NotFound`.
    async fn set_digest(&self, id: UserId, digest: &str) -> AppResult<()>;

    /// Records a successful login.
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()>;

    /// Applies allow-listed profile updates.
    async fn update_profile(&self, id: UserId, updates: &[ProfileUpdate]) -> AppResult<()>;
}

/// Durable session record storage.
///
/// `mark_redeemed` is the only mutation of an existing record and must be a
/// single atomic conditional update: of any number of concurrent calls for
/// the same token, at most one may return `true`.
#[async_trait]
pub trait SessionBackend: Send + Sync + std::fmt::Debug {
    /// Inserts a new record. A duplicate token is a `Conflict`.
    async fn insert(&self, record: &SessionRecord) -> AppResult<()>;

    /// Clears `valid` if, and only if, the record is valid, owned by
    /// `user_id`, has `purpose` and has not expired at `now`.
    ///
    /// Returns whether a record was updated.
    async fn mark_redeemed(
        &self,
        token: &str,
        user_id: UserId,
        purpose: SessionPurpose,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Looks up a record by token.
    async fn find(&self, token: &str) -> AppResult<Option<SessionRecord>>;

    /// Deletes one record. Returns whether it existed.
    async fn delete(&self, token: &str) -> AppResult<bool>;

    /// Deletes every record owned by a user. Returns the count removed.
    async fn delete_by_user(&self, user_id: UserId) -> AppResult<u64>;

    /// Deletes every record whose expiry is at or before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Lists a user's records, newest first.
    async fn list_by_user(&self, user_id: UserId) -> AppResult<Vec<SessionRecord>>;

    /// Counts a user's records that are still valid and unexpired at `now`.
    async fn count_valid_by_user(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<u64>;
}
