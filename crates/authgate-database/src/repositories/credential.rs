//! Credential repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use authgate_core::error::{AppError, ErrorKind};
use authgate_core::result::AppResult;
use authgate_core::types::UserId;

use crate::models::{Credential, NewCredential, ProfileUpdate};
use crate::traits::CredentialStore;

const CREDENTIAL_COLUMNS: &str =
    "id, username, password_hash, is_active, is_staff, is_superuser, last_login";

/// Repository for the authentication columns of the `users` table.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    /// Create a new credential repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(e: sqlx::Error, message: &str) -> AppError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AppError::conflict("Username already taken")
    } else {
        AppError::with_source(ErrorKind::Database, message.to_string(), e)
    }
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn get_credential(&self, username: &str) -> AppResult<Option<Credential>> {
        sqlx::query_as::<_, Credential>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find credential", e))
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<Credential>> {
        sqlx::query_as::<_, Credential>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find credential by id", e)
        })
    }

    async fn create(&self, data: &NewCredential) -> AppResult<Credential> {
        sqlx::query_as::<_, Credential>(&format!(
            "INSERT INTO users (username, password_hash, is_staff, is_superuser) \
             VALUES ($1, $2, $3, $4) RETURNING {CREDENTIAL_COLUMNS}"
        ))
        .bind(&data.username)
        .bind(&data.password_hash)
        .bind(data.is_staff)
        .bind(data.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to create credential"))
    }

    async fn set_digest(&self, id: UserId, digest: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(digest)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set digest", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record login", e))?;
        Ok(())
    }

    async fn update_profile(&self, id: UserId, updates: &[ProfileUpdate]) -> AppResult<()> {
        if updates.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut assignments = builder.separated(", ");
        for update in updates {
            // Column names come from the closed ProfileField enum.
            assignments.push(update.field.column());
            assignments.push_unseparated(" = ");
            assignments.push_bind_unseparated(update.value.clone());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Failed to update profile"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }
}
