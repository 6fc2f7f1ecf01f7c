//! Access token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authgate_core::types::UserId;
use authgate_database::Credential;

/// Claims payload embedded in every access token.
///
/// Serialized as `{"id", "username", "is_staff", "exp"}`; `exp` is in unix
/// seconds (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject user id.
    pub id: UserId,
    /// Username at issuance.
    pub username: String,
    /// Staff flag at issuance.
    pub is_staff: bool,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl AccessClaims {
    /// Claims for a credential, expiring at `expires_at`.
    pub fn for_credential(credential: &Credential, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: credential.id,
            username: credential.username.clone(),
            is_staff: credential.is_staff,
            exp: expires_at.timestamp(),
        }
    }
}
