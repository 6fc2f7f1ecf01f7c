//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;

use authgate_auth::{
    AccessClaims, AuthSessionManager, KeyMaterial, KeyRing, PasswordHasher, PasswordValidator,
    SessionStore, TokenSigner,
};
use authgate_core::bounded::CallBounds;
use authgate_core::config::{AuthConfig, KdfConfig, SessionConfig};
use authgate_database::{Credential, MemoryCredentialStore, MemorySessionBackend};

/// A password the default policy accepts.
pub const PASSWORD: &str = "Plinth-Quartz-Harbor-92";

/// A second accepted password.
pub const NEW_PASSWORD: &str = "Lantern-Orbit-Meadow-57";

/// Test application context
pub struct TestApp {
    /// The manager under test
    pub manager: AuthSessionManager,
    /// Credential store, for direct manipulation
    pub credentials: Arc<MemoryCredentialStore>,
    /// Session backend, for direct inspection
    pub backend: Arc<MemorySessionBackend>,
}

impl TestApp {
    /// Create an app with the default 15 minute access TTL
    pub fn new() -> Self {
        Self::with_access_ttl(Duration::minutes(15))
    }

    /// Create an app issuing access tokens with the given lifetime.
    ///
    /// A negative lifetime yields tokens that are already expired.
    pub fn with_access_ttl(access_ttl: Duration) -> Self {
        let credentials = Arc::new(MemoryCredentialStore::new());
        let backend = Arc::new(MemorySessionBackend::new());
        let bounds = CallBounds {
            timeout: StdDuration::from_secs(5),
            read_retries: 2,
            backoff: StdDuration::from_millis(1),
        };

        let ring = KeyRing::new(KeyMaterial::Secret(b"integration-test-secret-32-bytes!".to_vec()))
            .expect("Failed to build key ring");
        let hasher = PasswordHasher::new(KdfConfig {
            memory_kib: 1024,
            iterations: 1,
            ..KdfConfig::default()
        });

        let manager = AuthSessionManager::new(
            credentials.clone(),
            Arc::new(
                SessionStore::new(backend.clone(), &SessionConfig::default(), bounds)
                    .expect("Failed to build session store"),
            ),
            Arc::new(TokenSigner::new(Arc::new(ring), access_ttl)),
            Arc::new(hasher),
            PasswordValidator::new(&AuthConfig::default()),
            bounds,
        );

        Self {
            manager,
            credentials,
            backend,
        }
    }

    /// Create a regular user with [`PASSWORD`]
    pub async fn create_test_user(&self, username: &str) -> Credential {
        self.manager
            .create_user(username, Some(PASSWORD), false, false)
            .await
            .expect("Failed to create test user")
    }

    /// Verify an access token as a bearer header would present it
    pub fn bearer(&self, access_token: &str) -> Result<AccessClaims, authgate_auth::AuthError> {
        self.manager.authenticate(&format!("Bearer {access_token}"))
    }

    /// Count sessions a user could still redeem
    pub async fn active_sessions(&self, user: &Credential) -> u64 {
        self.manager
            .sessions()
            .count_active(user.id)
            .await
            .expect("Failed to count sessions")
    }
}
