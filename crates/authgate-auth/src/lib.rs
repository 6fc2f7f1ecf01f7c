//! # authgate-auth
//!
//! The credential and token-session core of authgate.
//!
//! ## Modules
//!
//! - `password`: Argon2id digests and new-password policy
//! - `jwt`: access token signing and verification with a pinned algorithm
//! - `session`: refresh/reset records with one-time redemption, the
//!   login/refresh/reset orchestration and periodic cleanup
//! - `guard`: bearer header parsing
//! - `error`: typed outcomes and their public messages

pub mod error;
pub mod guard;
pub mod jwt;
pub mod password;
pub mod session;
mod ttl;

pub use error::{AuthError, CredentialError, DigestError, TokenError};
pub use jwt::{AccessClaims, IssuedToken, KeyMaterial, KeyRing, TokenSigner};
pub use password::{PasswordHasher, PasswordValidator};
pub use session::{
    AuthSessionManager, IssuedSession, RedeemOutcome, SessionCleanup, SessionStore, TokenPair,
};
