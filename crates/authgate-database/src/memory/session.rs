//! In-memory session backend using `DashMap`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use authgate_core::error::AppError;
use authgate_core::result::AppResult;
use authgate_core::types::UserId;

use crate::models::{SessionPurpose, SessionRecord};
use crate::traits::SessionBackend;

/// In-memory session backend.
///
/// `mark_redeemed` holds the shard write lock for the whole check-and-clear,
/// which gives the same single-winner guarantee as the conditional `UPDATE`.
#[derive(Debug, Default)]
pub struct MemorySessionBackend {
    records: DashMap<String, SessionRecord>,
}

impl MemorySessionBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, valid or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn remove_where(&self, keep: impl Fn(&SessionRecord) -> bool) -> u64 {
        let doomed: Vec<String> = self
            .records
            .iter()
            .filter(|entry| !keep(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        doomed
            .into_iter()
            .filter(|token| self.records.remove_if(token, |_, rec| !keep(rec)).is_some())
            .count() as u64
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn insert(&self, record: &SessionRecord) -> AppResult<()> {
        match self.records.entry(record.token.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict("Session token already exists")),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn mark_redeemed(
        &self,
        token: &str,
        user_id: UserId,
        purpose: SessionPurpose,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.records.get_mut(token) {
            Some(mut rec) if rec.is_redeemable_by(user_id, purpose, now) => {
                rec.valid = false;
                rec.redeemed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, token: &str) -> AppResult<Option<SessionRecord>> {
        Ok(self.records.get(token).map(|rec| rec.value().clone()))
    }

    async fn delete(&self, token: &str) -> AppResult<bool> {
        Ok(self.records.remove(token).is_some())
    }

    async fn delete_by_user(&self, user_id: UserId) -> AppResult<u64> {
        Ok(self.remove_where(|rec| rec.user_id != user_id))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        Ok(self.remove_where(|rec| !rec.is_expired_at(now)))
    }

    async fn list_by_user(&self, user_id: UserId) -> AppResult<Vec<SessionRecord>> {
        let mut records: Vec<SessionRecord> = self
            .records
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn count_valid_by_user(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<u64> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.valid && !entry.is_expired_at(now))
            .count() as u64)
    }
}
