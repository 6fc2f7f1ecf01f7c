//! Credential record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use authgate_core::types::UserId;

/// The authentication-relevant slice of a user row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Credential {
    /// Unique user identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Encoded salt and derived key. Empty means a reset is required.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the account may log in.
    pub is_active: bool,
    /// Staff privilege flag, carried into access tokens.
    pub is_staff: bool,
    /// Superuser privilege flag.
    pub is_superuser: bool,
    /// Last successful login time.
    pub last_login: Option<DateTime<Utc>>,
}

impl Credential {
    /// An empty digest blocks login until the password is reset.
    pub fn requires_password_change(&self) -> bool {
        self.password_hash.is_empty()
    }
}

/// Data required to create a new credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCredential {
    /// Desired username.
    pub username: String,
    /// Pre-hashed password, or empty to force a reset before first login.
    pub password_hash: String,
    /// Staff flag.
    pub is_staff: bool,
    /// Superuser flag.
    pub is_superuser: bool,
}
