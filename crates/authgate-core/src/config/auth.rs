//! Authentication configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Credential hashing and token signing configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Signature algorithm pinned for every issued and verified token.
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
    /// Shared secret for `HS256`. Must be at least 32 bytes.
    #[serde(default)]
    pub jwt_secret: String,
    /// PEM private key used to sign `RS256` tokens.
    #[serde(default)]
    pub private_key_path: Option<String>,
    /// PEM public key used to verify `RS256` tokens.
    #[serde(default)]
    pub public_key_path: Option<String>,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Minimum password length for new passwords.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
    /// Minimum zxcvbn score (0-4) for new passwords.
    #[serde(default = "default_password_score")]
    pub password_min_score: u8,
    /// Key derivation parameters.
    #[serde(default)]
    pub kdf: KdfConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::default(),
            jwt_secret: String::new(),
            private_key_path: None,
            public_key_path: None,
            access_ttl_minutes: default_access_ttl(),
            password_min_length: default_password_min(),
            password_min_score: default_password_score(),
            kdf: KdfConfig::default(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("algorithm", &self.algorithm)
            .field("jwt_secret", &"<redacted>")
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("password_min_length", &self.password_min_length)
            .field("password_min_score", &self.password_min_score)
            .field("kdf", &self.kdf)
            .finish()
    }
}

/// Token signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC-SHA256 with a shared secret.
    #[default]
    #[serde(rename = "HS256")]
    Hs256,
    /// RSASSA-PKCS1-v1_5 with SHA-256; private key signs, public key verifies.
    #[serde(rename = "RS256")]
    Rs256,
}

impl SigningAlgorithm {
    /// The `alg` header value for this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Rs256 => "RS256",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argon2id parameters for password digests.
///
/// Changing any of these invalidates every stored digest, since the
/// parameters are not embedded in the digest itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Number of passes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Degree of parallelism.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    /// Salt length in bytes.
    #[serde(default = "default_salt_len")]
    pub salt_len: usize,
    /// Derived key length in bytes.
    #[serde(default = "default_key_len")]
    pub key_len: usize,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
            salt_len: default_salt_len(),
            key_len: default_key_len(),
        }
    }
}

fn default_access_ttl() -> u64 {
    15
}

fn default_password_min() -> usize {
    8
}

fn default_password_score() -> u8 {
    3
}

fn default_memory_kib() -> u32 {
    19456
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

fn default_salt_len() -> usize {
    16
}

fn default_key_len() -> usize {
    32
}
