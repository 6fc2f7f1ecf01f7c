//! In-memory credential store using a Tokio `RwLock`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use authgate_core::error::AppError;
use authgate_core::result::AppResult;
use authgate_core::types::UserId;

use crate::models::{Credential, NewCredential, ProfileField, ProfileUpdate};
use crate::traits::CredentialStore;

#[derive(Debug)]
struct UserRow {
    credential: Credential,
    profile: HashMap<ProfileField, String>,
}

#[derive(Debug, Default)]
struct InnerState {
    next_id: UserId,
    users: HashMap<UserId, UserRow>,
}

impl InnerState {
    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|row| row.credential.username == username && Some(row.credential.id) != except)
    }
}

/// In-memory credential store.
///
/// Suitable for tests and single-node tooling only.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    state: Arc<RwLock<InnerState>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the activity flag of an account.
    pub async fn set_active(&self, id: UserId, active: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        let row = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        row.credential.is_active = active;
        Ok(())
    }

    /// Removes an account.
    pub async fn remove(&self, id: UserId) -> bool {
        self.state.write().await.users.remove(&id).is_some()
    }

    /// Reads back a profile column.
    pub async fn profile_value(&self, id: UserId, field: ProfileField) -> Option<String> {
        let state = self.state.read().await;
        let row = state.users.get(&id)?;
        match field {
            ProfileField::Username => Some(row.credential.username.clone()),
            _ => row.profile.get(&field).cloned(),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credential(&self, username: &str) -> AppResult<Option<Credential>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|row| row.credential.username == username)
            .map(|row| row.credential.clone()))
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<Credential>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|row| row.credential.clone()))
    }

    async fn create(&self, data: &NewCredential) -> AppResult<Credential> {
        let mut state = self.state.write().await;
        if state.username_taken(&data.username, None) {
            return Err(AppError::conflict("Username already taken"));
        }

        state.next_id += 1;
        let credential = Credential {
            id: state.next_id,
            username: data.username.clone(),
            password_hash: data.password_hash.clone(),
            is_active: true,
            is_staff: data.is_staff,
            is_superuser: data.is_superuser,
            last_login: None,
        };
        state.users.insert(
            credential.id,
            UserRow {
                credential: credential.clone(),
                profile: HashMap::new(),
            },
        );
        Ok(credential)
    }

    async fn set_digest(&self, id: UserId, digest: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let row = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        row.credential.password_hash = digest.to_string();
        Ok(())
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.write().await;
        if let Some(row) = state.users.get_mut(&id) {
            row.credential.last_login = Some(at);
        }
        Ok(())
    }

    async fn update_profile(&self, id: UserId, updates: &[ProfileUpdate]) -> AppResult<()> {
        if updates.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let mut state = self.state.write().await;
        if let Some(rename) = updates.iter().find(|u| u.field == ProfileField::Username) {
            if state.username_taken(&rename.value, Some(id)) {
                return Err(AppError::conflict("Username already taken"));
            }
        }

        let row = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        for update in updates {
            match update.field {
                ProfileField::Username => row.credential.username = update.value.clone(),
                field => {
                    row.profile.insert(field, update.value.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::error::ErrorKind;

    fn new_user(name: &str) -> NewCredential {
        NewCredential {
            username: name.to_string(),
            password_hash: "digest".to_string(),
            is_staff: false,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = MemoryCredentialStore::new();
        let alice = store.create(&new_user("alice")).await.unwrap();
        let bob = store.create(&new_user("bob")).await.unwrap();
        assert_ne!(alice.id, bob.id);

        let found = store.get_credential("alice").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(found.is_active);
        assert!(store.get_credential("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryCredentialStore::new();
        store.create(&new_user("alice")).await.unwrap();
        let err = store.create(&new_user("alice")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_set_digest_unknown_user() {
        let store = MemoryCredentialStore::new();
        let err = store.set_digest(99, "x").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = MemoryCredentialStore::new();
        let alice = store.create(&new_user("alice")).await.unwrap();
        store.create(&new_user("bob")).await.unwrap();

        store
            .update_profile(
                alice.id,
                &[
                    ProfileUpdate {
                        field: ProfileField::Email,
                        value: "alice@example.com".to_string(),
                    },
                    ProfileUpdate {
                        field: ProfileField::Username,
                        value: "alicia".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            store.profile_value(alice.id, ProfileField::Email).await.as_deref(),
            Some("alice@example.com")
        );
        assert!(store.get_credential("alicia").await.unwrap().is_some());

        let rename = [ProfileUpdate {
            field: ProfileField::Username,
            value: "bob".to_string(),
        }];
        let err = store.update_profile(alice.id, &rename).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }
}
