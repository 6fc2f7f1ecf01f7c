//! Argon2id password hashing and verification.
//!
//! Digests are stored as `base64(salt || key)` with the standard padded
//! alphabet. The KDF parameters are not embedded, so every digest in a
//! deployment must have been produced with the same [`KdfConfig`].

use argon2::password_hash::Output;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;

use authgate_core::config::KdfConfig;
use authgate_core::error::AppError;
use authgate_core::result::AppResult;

use crate::error::DigestError;

/// Shortest accepted salt, in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Shortest accepted derived key, in bytes.
pub const MIN_KEY_LEN: usize = 16;

/// Handles password hashing and verification using Argon2id.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: KdfConfig,
}

impl PasswordHasher {
    /// Creates a hasher with the given KDF parameters.
    pub fn new(params: KdfConfig) -> Self {
        Self { params }
    }

    /// Creates a hasher from configuration, rejecting weak or invalid
    /// parameters.
    pub fn from_config(params: KdfConfig) -> AppResult<Self> {
        if params.salt_len < MIN_SALT_LEN {
            return Err(AppError::configuration(format!(
                "auth.kdf.salt_len must be at least {MIN_SALT_LEN} bytes"
            )));
        }
        if params.key_len < MIN_KEY_LEN {
            return Err(AppError::configuration(format!(
                "auth.kdf.key_len must be at least {MIN_KEY_LEN} bytes"
            )));
        }

        let hasher = Self::new(params);
        hasher
            .kdf_params()
            .map_err(|e| AppError::configuration(format!("Invalid auth.kdf parameters: {e}")))?;
        Ok(hasher)
    }

    /// Length in bytes of a decoded digest.
    pub fn digest_len(&self) -> usize {
        self.params.salt_len + self.params.key_len
    }

    /// Hashes a plaintext password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, DigestError> {
        let mut salt = vec![0u8; self.params.salt_len];
        rand::rng().fill_bytes(&mut salt);

        let key = self.derive(password, &salt)?;

        let mut digest = salt;
        digest.extend_from_slice(&key);
        Ok(STANDARD.encode(digest))
    }

    /// Verifies a plaintext password against an encoded digest.
    ///
    /// Returns `Ok(false)` only for a well-formed digest that does not
    /// match. A digest that cannot be decoded or has the wrong length is an
    /// error, never a match.
    pub fn verify(&self, digest: &str, password: &str) -> Result<bool, DigestError> {
        let raw = STANDARD.decode(digest).map_err(|_| DigestError::Encoding)?;
        if raw.len() != self.digest_len() {
            return Err(DigestError::Length {
                expected: self.digest_len(),
                actual: raw.len(),
            });
        }

        let (salt, stored) = raw.split_at(self.params.salt_len);
        let derived = self.derive(password, salt)?;

        // Output equality is constant-time.
        let stored = Output::new(stored).map_err(|e| DigestError::Kdf(e.to_string()))?;
        let derived = Output::new(&derived).map_err(|e| DigestError::Kdf(e.to_string()))?;
        Ok(stored == derived)
    }

    /// A digest of the right shape that matches no password in practice.
    ///
    /// Verifying against it costs the same as a real verification.
    pub fn placeholder_digest(&self) -> String {
        STANDARD.encode(vec![0u8; self.digest_len()])
    }

    fn kdf_params(&self) -> Result<Params, DigestError> {
        Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Some(self.params.key_len),
        )
        .map_err(|e| DigestError::Kdf(e.to_string()))
    }

    fn derive(&self, password: &str, salt: &[u8]) -> Result<Vec<u8>, DigestError> {
        let params = self.kdf_params()?;

        let mut key = vec![0u8; self.params.key_len];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| DigestError::Kdf(e.to_string()))?;
        Ok(key)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(KdfConfig::default())
    }
}
