//! Login, refresh, password reset and logout as protocol steps.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use authgate_core::bounded::{CallBounds, detached_write, with_read_retry, with_timeout};
use authgate_core::config::AppConfig;
use authgate_core::error::{AppError, ErrorKind};
use authgate_core::result::AppResult;
use authgate_core::types::UserId;
use authgate_database::{
    Credential, CredentialStore, NewCredential, ProfileUpdate, SessionBackend, SessionPurpose,
};

use crate::error::{AuthError, CredentialError, DigestError, TokenError};
use crate::guard::bearer_token;
use crate::jwt::{AccessClaims, TokenSigner};
use crate::password::{PasswordHasher, PasswordValidator};

use super::store::{IssuedSession, RedeemOutcome, SessionStore};

/// Access and refresh tokens handed out together.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenPair {
    /// Short-lived signed access token.
    pub access_token: String,
    /// Long-lived opaque refresh token, redeemable once.
    pub refresh_token: String,
    /// Access token expiration timestamp.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration timestamp.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Orchestrates the hasher, signer and session store.
///
/// Holds no mutable state of its own; every request can run concurrently.
#[derive(Debug, Clone)]
pub struct AuthSessionManager {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<SessionStore>,
    signer: Arc<TokenSigner>,
    hasher: Arc<PasswordHasher>,
    validator: PasswordValidator,
    bounds: CallBounds,
}

impl AuthSessionManager {
    /// Creates a manager from its collaborators.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<SessionStore>,
        signer: Arc<TokenSigner>,
        hasher: Arc<PasswordHasher>,
        validator: PasswordValidator,
        bounds: CallBounds,
    ) -> Self {
        Self {
            credentials,
            sessions,
            signer,
            hasher,
            validator,
            bounds,
        }
    }

    /// Builds the whole authentication graph from configuration.
    pub fn from_config(
        config: &AppConfig,
        credentials: Arc<dyn CredentialStore>,
        backend: Arc<dyn SessionBackend>,
    ) -> AppResult<Self> {
        let bounds = CallBounds::from_config(&config.store);
        let signer = TokenSigner::from_config(&config.auth)?;
        info!(algorithm = %signer.algorithm(), "Token signer ready");

        Ok(Self::new(
            credentials,
            Arc::new(SessionStore::new(backend, &config.session, bounds)?),
            Arc::new(signer),
            Arc::new(PasswordHasher::from_config(config.auth.kdf.clone())?),
            PasswordValidator::new(&config.auth),
            bounds,
        ))
    }

    /// The session store.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The token signer.
    pub fn signer(&self) -> &Arc<TokenSigner> {
        &self.signer
    }

    /// Verifies a username/password pair and issues a fresh token pair.
    ///
    /// Unknown users and empty digests still pay for one KDF run. The
    /// activity flag is only consulted after the password matched.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(credential) = self.find_by_username(username).await? else {
            self.burn_verification(password).await?;
            warn!(username = %username, "Login failed: unknown user");
            return Err(CredentialError::UnknownUser.into());
        };

        if credential.requires_password_change() {
            self.burn_verification(password).await?;
            warn!(user_id = %credential.id, "Login blocked: password change needed");
            return Err(CredentialError::PasswordChangeRequired.into());
        }

        match self
            .check_password(credential.password_hash.clone(), password)
            .await?
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(user_id = %credential.id, "Login failed: wrong password");
                return Err(CredentialError::WrongPassword.into());
            }
            Err(e) => {
                error!(user_id = %credential.id, error = %e, "Stored password digest is unusable");
                return Err(CredentialError::MalformedDigest.into());
            }
        }

        if !credential.is_active {
            warn!(user_id = %credential.id, "Login refused: account deactivated");
            return Err(CredentialError::Deactivated.into());
        }

        let tokens = self.issue_pair(&credential).await?;

        let recorded = with_timeout(
            self.bounds.timeout,
            "record login",
            self.credentials.record_login(credential.id, Utc::now()),
        )
        .await;
        if let Err(e) = recorded {
            warn!(user_id = %credential.id, error = %e, "Failed to record last login");
        }

        info!(user_id = %credential.id, "Login successful");
        Ok(tokens)
    }

    /// Trades a signed (possibly expired) access token and its refresh
    /// token for a new pair.
    ///
    /// Any sign of replay revokes every session of the user before failing.
    pub async fn refresh(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.signer.verify_allow_expired(access_token).map_err(|e| {
            warn!(error = %e, "Refresh rejected: access token invalid");
            AuthError::Unauthorized(e)
        })?;

        match self
            .sessions
            .redeem(refresh_token, claims.id, SessionPurpose::Refresh)
            .await?
        {
            RedeemOutcome::Authorized => {}
            RedeemOutcome::ReLoginRequired => return Err(AuthError::LoginRequired),
            RedeemOutcome::HijackSuspected { owner } => {
                self.revoke_family(claims.id, owner).await?;
                return Err(AuthError::LoginRequired);
            }
        }

        let credential = match self.find_by_id(claims.id).await? {
            Some(c) if c.is_active && !c.requires_password_change() => c,
            _ => {
                warn!(user_id = %claims.id, "Refresh refused: account missing or unavailable");
                return Err(AuthError::LoginRequired);
            }
        };

        let tokens = self.issue_pair(&credential).await?;
        info!(user_id = %credential.id, "Tokens refreshed");
        Ok(tokens)
    }

    /// Creates a short-lived password-reset token for `username`.
    ///
    /// Returns `None` for an unknown username. Delivering the token is up to
    /// the caller, which must answer the same way in both cases.
    pub async fn password_reset(&self, username: &str) -> Result<Option<IssuedSession>, AuthError> {
        let Some(credential) = self.find_by_username(username).await? else {
            warn!(username = %username, "Password reset requested for unknown user");
            return Ok(None);
        };

        let issued = self
            .sessions
            .create(credential.id, SessionPurpose::PasswordReset)
            .await?;
        info!(user_id = %credential.id, expires_at = %issued.expires_at, "Password reset token issued");
        Ok(Some(issued))
    }

    /// Redeems a reset token and replaces the password.
    ///
    /// A weak password is refused before the token is touched. On success
    /// every session of the user, the reset token included, is revoked.
    ///
    /// `username` is unauthenticated, so a misused token only revokes the
    /// sessions of the account that held it.
    pub async fn complete_password_reset(
        &self,
        username: &str,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.validator
            .validate(new_password, &[username])
            .map_err(AuthError::WeakPassword)?;

        let Some(credential) = self.find_by_username(username).await? else {
            warn!(username = %username, "Password reset for unknown user");
            return Err(AuthError::ResetRejected);
        };

        match self
            .sessions
            .redeem(reset_token, credential.id, SessionPurpose::PasswordReset)
            .await?
        {
            RedeemOutcome::Authorized => {}
            RedeemOutcome::ReLoginRequired => return Err(AuthError::ResetRejected),
            RedeemOutcome::HijackSuspected { owner } => {
                let revoked = self.sessions.invalidate_all(owner).await?;
                warn!(
                    owner = %owner,
                    revoked = revoked,
                    "Reset token misused: owner sessions revoked"
                );
                return Err(AuthError::ResetRejected);
            }
        }

        let digest = self.hash_password(new_password).await?;
        self.store_digest(credential.id, digest).await?;
        let revoked = self.sessions.invalidate_all(credential.id).await?;

        info!(user_id = %credential.id, revoked = revoked, "Password reset completed");
        Ok(())
    }

    /// Revokes one refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let existed = self.sessions.invalidate_one(refresh_token).await?;
        debug!(existed = existed, "Logout processed");
        Ok(())
    }

    /// Revokes every session of the caller.
    pub async fn logout_all(&self, claims: &AccessClaims) -> Result<u64, AuthError> {
        let revoked = self.sessions.invalidate_all(claims.id).await?;
        info!(user_id = %claims.id, revoked = revoked, "Logged out everywhere");
        Ok(revoked)
    }

    /// Verifies an `Authorization: Bearer` header value.
    ///
    /// An expired token is rejected like any other invalid token.
    pub fn authenticate(&self, authorization: &str) -> Result<AccessClaims, AuthError> {
        let token = bearer_token(authorization).ok_or(TokenError::Malformed)?;
        self.signer.verify(token).map_err(|e| {
            debug!(error = %e, "Bearer token rejected");
            AuthError::Unauthorized(e)
        })
    }

    /// Requires the staff flag carried in the token.
    pub fn require_staff(&self, claims: &AccessClaims) -> Result<(), AuthError> {
        if claims.is_staff {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Requires a currently active superuser. Re-reads the account.
    pub async fn require_superuser(&self, claims: &AccessClaims) -> Result<(), AuthError> {
        match self.find_by_id(claims.id).await? {
            Some(c) if c.is_active && c.is_superuser => Ok(()),
            _ => {
                warn!(user_id = %claims.id, "Superuser check failed");
                Err(AuthError::Forbidden)
            }
        }
    }

    /// Applies a partial profile update for the caller.
    ///
    /// Keys outside the allow-list are refused as a whole.
    pub async fn update_profile(
        &self,
        claims: &AccessClaims,
        fields: &Map<String, Value>,
    ) -> AppResult<()> {
        let updates = ProfileUpdate::from_json(fields)?;
        let credentials = self.credentials.clone();
        let user_id = claims.id;
        detached_write(self.bounds.timeout, "profile update", async move {
            credentials.update_profile(user_id, &updates).await
        })
        .await?;
        info!(user_id = %user_id, "Profile updated");
        Ok(())
    }

    /// Creates an account. Without a password the account must reset
    /// before its first login.
    pub async fn create_user(
        &self,
        username: &str,
        password: Option<&str>,
        is_staff: bool,
        is_superuser: bool,
    ) -> AppResult<Credential> {
        let password_hash = match password {
            Some(password) => {
                self.validator
                    .validate(password, &[username])
                    .map_err(AppError::validation)?;
                self.hash_password(password).await?
            }
            None => String::new(),
        };

        let data = NewCredential {
            username: username.to_string(),
            password_hash,
            is_staff,
            is_superuser,
        };
        let credentials = self.credentials.clone();
        let credential = detached_write(self.bounds.timeout, "credential create", async move {
            credentials.create(&data).await
        })
        .await?;

        info!(user_id = %credential.id, username = %credential.username, "User created");
        Ok(credential)
    }

    /// Replaces a password administratively and revokes every session.
    ///
    /// Returns the number of sessions revoked.
    pub async fn set_password(&self, username: &str, password: &str) -> AppResult<u64> {
        self.validator
            .validate(password, &[username])
            .map_err(AppError::validation)?;

        let credential = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;

        let digest = self.hash_password(password).await?;
        self.store_digest(credential.id, digest).await?;
        let revoked = self.sessions.invalidate_all(credential.id).await?;

        info!(user_id = %credential.id, revoked = revoked, "Password set");
        Ok(revoked)
    }

    /// Looks up an account by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Credential>> {
        with_read_retry(&self.bounds, "credential lookup", || {
            self.credentials.get_credential(username)
        })
        .await
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<Credential>> {
        with_read_retry(&self.bounds, "credential lookup by id", || {
            self.credentials.find_by_id(id)
        })
        .await
    }

    async fn issue_pair(&self, credential: &Credential) -> AppResult<TokenPair> {
        let access = self.signer.issue_access(credential)?;
        let refresh = self
            .sessions
            .create(credential.id, SessionPurpose::Refresh)
            .await?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }

    async fn revoke_family(&self, presenter: UserId, owner: UserId) -> AppResult<()> {
        let mut revoked = self.sessions.invalidate_all(presenter).await?;
        if owner != presenter {
            revoked += self.sessions.invalidate_all(owner).await?;
        }
        warn!(
            user_id = %presenter,
            owner = %owner,
            revoked = revoked,
            "Hijack suspected: all sessions revoked"
        );
        Ok(())
    }

    async fn check_password(
        &self,
        digest: String,
        password: &str,
    ) -> AppResult<Result<bool, DigestError>> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Password verification task failed", e)
            })
    }

    /// Runs a verification whose result is discarded.
    async fn burn_verification(&self, password: &str) -> AppResult<()> {
        let _ = self
            .check_password(self.hasher.placeholder_digest(), password)
            .await?;
        Ok(())
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Password hashing task failed", e)
            })?
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
    }

    async fn store_digest(&self, id: UserId, digest: String) -> AppResult<()> {
        let credentials = self.credentials.clone();
        detached_write(self.bounds.timeout, "set digest", async move {
            credentials.set_digest(id, &digest).await
        })
        .await
    }
}
