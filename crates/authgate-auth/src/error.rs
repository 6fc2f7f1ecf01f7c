//! Typed authentication outcomes.
//!
//! Internally every failure keeps its precise cause so it can be logged.
//! Only [`AuthError::public_message`] may be shown to a client, and it
//! deliberately collapses causes that an attacker must not tell apart.

use thiserror::Error;

use authgate_core::error::{AppError, ErrorKind};

/// A stored password digest could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// The digest is not valid base64.
    #[error("digest is not valid base64")]
    Encoding,
    /// The digest decodes to the wrong number of bytes.
    #[error("digest has {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
    /// The key derivation function rejected its inputs.
    #[error("key derivation failed: {0}")]
    Kdf(String),
}

/// A bearer token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token algorithm does not match the pinned algorithm")]
    AlgorithmMismatch,
    #[error("token signature is invalid")]
    SignatureInvalid,
    /// Signature and algorithm are fine, only the expiry has passed.
    #[error("token has expired")]
    Expired,
}

/// Why a username/password pair was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("unknown user")]
    UnknownUser,
    #[error("wrong password")]
    WrongPassword,
    #[error("stored digest is malformed")]
    MalformedDigest,
    /// The stored digest is empty.
    #[error("password change needed")]
    PasswordChangeRequired,
    #[error("account deactivated")]
    Deactivated,
}

/// Failure of an authentication protocol step.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential rejected: {0}")]
    Credential(#[from] CredentialError),
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] TokenError),
    /// The refresh token is unusable; the client must log in again.
    /// Covers both routine expiry and detected replay.
    #[error("login required")]
    LoginRequired,
    #[error("password reset rejected")]
    ResetRejected,
    #[error("forbidden")]
    Forbidden,
    #[error("weak password: {0}")]
    WeakPassword(String),
    /// The store or runtime failed; not an authentication decision.
    #[error(transparent)]
    Infrastructure(#[from] AppError),
}

impl AuthError {
    /// The only text a transport may return to the client.
    pub fn public_message(&self) -> &str {
        match self {
            Self::Credential(CredentialError::Deactivated) => "Account unavailable",
            Self::Credential(_) => "Invalid credentials",
            Self::Unauthorized(_) => "Unauthorized",
            Self::LoginRequired => "Login required",
            Self::ResetRejected => "Invalid or expired reset token",
            Self::Forbidden => "Forbidden",
            Self::WeakPassword(reason) => reason,
            Self::Infrastructure(_) => "Service unavailable",
        }
    }

    /// Whether the failure is a 5xx-class infrastructure failure.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let kind = match err {
            AuthError::Infrastructure(inner) => return inner,
            AuthError::Forbidden => ErrorKind::Authorization,
            AuthError::WeakPassword(_) => ErrorKind::Validation,
            _ => ErrorKind::Authentication,
        };
        AppError::new(kind, err.public_message())
    }
}
