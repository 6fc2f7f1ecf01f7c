//! Signing key material and runtime rotation.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::info;

use authgate_core::config::{AuthConfig, SigningAlgorithm};
use authgate_core::error::{AppError, ErrorKind};
use authgate_core::result::AppResult;

/// Minimum accepted length of an HS256 shared secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Raw key material for one signing algorithm.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Shared secret for `HS256`.
    Secret(Vec<u8>),
    /// PEM key pair for `RS256`.
    Rsa {
        private_pem: Vec<u8>,
        public_pem: Vec<u8>,
    },
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("KeyMaterial::Secret(<redacted>)"),
            Self::Rsa { .. } => f.write_str("KeyMaterial::Rsa(<redacted>)"),
        }
    }
}

impl KeyMaterial {
    /// The algorithm this material signs with.
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            Self::Secret(_) => SigningAlgorithm::Hs256,
            Self::Rsa { .. } => SigningAlgorithm::Rs256,
        }
    }

    /// Reads key material named by the auth configuration.
    ///
    /// For `RS256` both PEM files are read from disk.
    pub fn from_config(config: &AuthConfig) -> AppResult<Self> {
        match config.algorithm {
            SigningAlgorithm::Hs256 => Ok(Self::Secret(config.jwt_secret.as_bytes().to_vec())),
            SigningAlgorithm::Rs256 => {
                let private_path = config.private_key_path.as_deref().ok_or_else(|| {
                    AppError::configuration("auth.private_key_path is required for RS256")
                })?;
                let public_path = config.public_key_path.as_deref().ok_or_else(|| {
                    AppError::configuration("auth.public_key_path is required for RS256")
                })?;
                Ok(Self::Rsa {
                    private_pem: read_key_file(private_path)?,
                    public_pem: read_key_file(public_path)?,
                })
            }
        }
    }

    fn prepare(self) -> AppResult<PreparedKeys> {
        let keys = match self {
            Self::Secret(secret) => {
                if secret.len() < MIN_SECRET_LEN {
                    return Err(AppError::configuration(format!(
                        "auth.jwt_secret must be at least {MIN_SECRET_LEN} bytes"
                    )));
                }
                PreparedKeys {
                    algorithm: SigningAlgorithm::Hs256,
                    encoding: EncodingKey::from_secret(&secret),
                    decoding: DecodingKey::from_secret(&secret),
                    public_pem: None,
                }
            }
            Self::Rsa {
                private_pem,
                public_pem,
            } => {
                let encoding = EncodingKey::from_rsa_pem(&private_pem).map_err(|e| {
                    AppError::with_source(ErrorKind::Configuration, "Invalid RSA private key", e)
                })?;
                let decoding = DecodingKey::from_rsa_pem(&public_pem).map_err(|e| {
                    AppError::with_source(ErrorKind::Configuration, "Invalid RSA public key", e)
                })?;
                let public_pem = String::from_utf8(public_pem).map_err(|e| {
                    AppError::with_source(ErrorKind::Configuration, "RSA public key is not UTF-8", e)
                })?;
                PreparedKeys {
                    algorithm: SigningAlgorithm::Rs256,
                    encoding,
                    decoding,
                    public_pem: Some(public_pem),
                }
            }
        };
        keys.self_check()?;
        Ok(keys)
    }
}

fn read_key_file(path: &str) -> AppResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Failed to read key file '{path}'"),
            e,
        )
    })
}

/// Parsed keys ready for signing and verification.
pub(crate) struct PreparedKeys {
    pub(crate) algorithm: SigningAlgorithm,
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
    pub(crate) public_pem: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct CheckClaims {
    exp: i64,
}

impl PreparedKeys {
    /// Signs and verifies a throwaway token. Fails on a mismatched pair.
    fn self_check(&self) -> AppResult<()> {
        let algorithm = jwt_algorithm(self.algorithm);
        let claims = CheckClaims { exp: i64::MAX / 2 };
        let token = encode(&Header::new(algorithm), &claims, &self.encoding).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Signing key cannot sign", e)
        })?;
        decode::<CheckClaims>(&token, &self.decoding, &Validation::new(algorithm)).map_err(
            |e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    "Verification key does not match signing key",
                    e,
                )
            },
        )?;
        Ok(())
    }
}

/// Maps the configured algorithm onto the `jsonwebtoken` algorithm.
pub(crate) fn jwt_algorithm(algorithm: SigningAlgorithm) -> Algorithm {
    match algorithm {
        SigningAlgorithm::Hs256 => Algorithm::HS256,
        SigningAlgorithm::Rs256 => Algorithm::RS256,
    }
}

/// Holds the current signing keys and allows replacing them at runtime.
///
/// Readers take an `Arc` snapshot, so a rotation never disturbs a
/// signature check already in progress. The algorithm is fixed for the
/// lifetime of the ring.
pub struct KeyRing {
    algorithm: SigningAlgorithm,
    current: RwLock<Arc<PreparedKeys>>,
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl KeyRing {
    /// Creates a ring from key material.
    pub fn new(material: KeyMaterial) -> AppResult<Self> {
        let keys = material.prepare()?;
        Ok(Self {
            algorithm: keys.algorithm,
            current: RwLock::new(Arc::new(keys)),
        })
    }

    /// Creates a ring from the auth configuration.
    pub fn from_config(config: &AuthConfig) -> AppResult<Self> {
        Self::new(KeyMaterial::from_config(config)?)
    }

    /// The algorithm pinned for this ring.
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Replaces the current keys. Material for another algorithm is refused.
    pub fn rotate(&self, material: KeyMaterial) -> AppResult<()> {
        if material.algorithm() != self.algorithm {
            return Err(AppError::configuration(format!(
                "Cannot rotate {} keys to {}",
                self.algorithm,
                material.algorithm()
            )));
        }
        let keys = Arc::new(material.prepare()?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = keys;
        info!(algorithm = %self.algorithm, "Signing keys rotated");
        Ok(())
    }

    /// Re-reads the configured secret or PEM files and rotates to them.
    pub fn reload(&self, config: &AuthConfig) -> AppResult<()> {
        self.rotate(KeyMaterial::from_config(config)?)
    }

    /// PEM of the RS256 verification key, for distribution to other verifiers.
    pub fn public_key_pem(&self) -> Option<String> {
        self.snapshot().public_pem.clone()
    }

    pub(crate) fn snapshot(&self) -> Arc<PreparedKeys> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_private.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_public.pem");
    const OTHER_PUBLIC_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_other_public.pem");

    #[test]
    fn test_short_secret_rejected() {
        let err = KeyRing::new(KeyMaterial::Secret(b"too-short".to_vec())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_hs256_has_no_public_key() {
        let ring = KeyRing::new(KeyMaterial::Secret(vec![7u8; 32])).unwrap();
        assert_eq!(ring.algorithm(), SigningAlgorithm::Hs256);
        assert!(ring.public_key_pem().is_none());
    }

    #[test]
    fn test_rs256_exposes_public_key() {
        let ring = KeyRing::new(KeyMaterial::Rsa {
            private_pem: PRIVATE_PEM.to_vec(),
            public_pem: PUBLIC_PEM.to_vec(),
        })
        .unwrap();
        let pem = ring.public_key_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let err = KeyRing::new(KeyMaterial::Rsa {
            private_pem: PRIVATE_PEM.to_vec(),
            public_pem: OTHER_PUBLIC_PEM.to_vec(),
        })
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_rotate_refuses_algorithm_change() {
        let ring = KeyRing::new(KeyMaterial::Secret(vec![7u8; 32])).unwrap();
        let err = ring
            .rotate(KeyMaterial::Rsa {
                private_pem: PRIVATE_PEM.to_vec(),
                public_pem: PUBLIC_PEM.to_vec(),
            })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(ring.algorithm(), SigningAlgorithm::Hs256);
    }

    #[test]
    fn test_from_config_requires_key_paths() {
        let config = AuthConfig {
            algorithm: SigningAlgorithm::Rs256,
            ..AuthConfig::default()
        };
        assert!(KeyRing::from_config(&config).is_err());
    }
}
