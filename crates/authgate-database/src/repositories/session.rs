//! Session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use authgate_core::error::{AppError, ErrorKind};
use authgate_core::result::AppResult;
use authgate_core::types::UserId;

use crate::models::{SessionPurpose, SessionRecord};
use crate::traits::SessionBackend;

/// Repository for the `sessions` table.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionBackend for SessionRepository {
    async fn insert(&self, record: &SessionRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, purpose, valid, created_at, expires_at, redeemed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.token)
        .bind(record.user_id)
        .bind(record.purpose)
        .bind(record.valid)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.redeemed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                AppError::conflict("Session token already exists")
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create session", e)
            }
        })?;
        Ok(())
    }

    async fn mark_redeemed(
        &self,
        token: &str,
        user_id: UserId,
        purpose: SessionPurpose,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET valid = FALSE, redeemed_at = $4 \
             WHERE token = $1 AND user_id = $2 AND purpose = $3 \
             AND valid = TRUE AND expires_at > $4",
        )
        .bind(token)
        .bind(user_id)
        .bind(purpose)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to redeem session", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, token: &str) -> AppResult<Option<SessionRecord>> {
        sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn delete(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete session", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete user sessions", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to purge expired sessions", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn list_by_user(&self, user_id: UserId) -> AppResult<Vec<SessionRecord>> {
        sqlx::query_as::<_, SessionRecord>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sessions", e))
    }

    async fn count_valid_by_user(&self, user_id: UserId, now: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND valid = TRUE AND expires_at > $2",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count sessions", e))?;
        Ok(count.max(0) as u64)
    }
}
