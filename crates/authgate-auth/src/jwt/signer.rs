//! Compact signed bearer tokens with a pinned algorithm.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::Deserialize;
use tracing::error;

use authgate_core::config::{AuthConfig, SigningAlgorithm};
use authgate_core::error::AppError;
use authgate_core::result::AppResult;
use authgate_database::Credential;

use super::claims::AccessClaims;
use super::keys::{KeyRing, jwt_algorithm};
use crate::error::TokenError;
use crate::ttl::{MINUTE, configured_ttl};

/// A freshly signed access token.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IssuedToken {
    /// Compact token string.
    pub token: String,
    /// Expiry embedded in the token.
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies access tokens.
///
/// Verification is pure: it reads a snapshot of the key ring and never
/// touches shared mutable state.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    keys: Arc<KeyRing>,
    access_ttl: Duration,
}

#[derive(Deserialize)]
struct HeaderAlg {
    alg: String,
}

impl TokenSigner {
    /// Creates a signer over an existing key ring.
    pub fn new(keys: Arc<KeyRing>, access_ttl: Duration) -> Self {
        Self { keys, access_ttl }
    }

    /// Creates a signer and its key ring from auth configuration.
    pub fn from_config(config: &AuthConfig) -> AppResult<Self> {
        let access_ttl =
            configured_ttl("auth.access_ttl_minutes", config.access_ttl_minutes, MINUTE)?;
        Ok(Self::new(Arc::new(KeyRing::from_config(config)?), access_ttl))
    }

    /// The pinned algorithm.
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.keys.algorithm()
    }

    /// The key ring, for rotation.
    pub fn key_ring(&self) -> &Arc<KeyRing> {
        &self.keys
    }

    /// See [`KeyRing::public_key_pem`].
    pub fn public_key_pem(&self) -> Option<String> {
        self.keys.public_key_pem()
    }

    /// Signs arbitrary claims.
    pub fn issue(&self, claims: &AccessClaims) -> AppResult<String> {
        let keys = self.keys.snapshot();
        encode(&Header::new(jwt_algorithm(keys.algorithm)), claims, &keys.encoding)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))
    }

    /// Signs an access token for `credential` expiring after the access TTL.
    pub fn issue_access(&self, credential: &Credential) -> AppResult<IssuedToken> {
        let expires_at = Utc::now() + self.access_ttl;
        let token = self.issue(&AccessClaims::for_credential(credential, expires_at))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies a token, including its expiry.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.decode(token, true)
    }

    /// Verifies everything except expiry. Only the refresh flow may use this.
    pub fn verify_allow_expired(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.decode(token, false)
    }

    fn decode(&self, token: &str, enforce_expiry: bool) -> Result<AccessClaims, TokenError> {
        let segments = token.split('.').collect::<Vec<_>>();
        if segments.len() != 3 {
            return Err(TokenError::Malformed);
        }

        // Checked by hand so that "none" and other unknown names are
        // reported as a mismatch instead of a parse failure.
        let raw = URL_SAFE_NO_PAD
            .decode(segments[0])
            .map_err(|_| TokenError::Malformed)?;
        let named: HeaderAlg = serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;
        let keys = self.keys.snapshot();
        if named.alg != keys.algorithm.as_str() {
            return Err(TokenError::AlgorithmMismatch);
        }

        let mut validation = Validation::new(jwt_algorithm(keys.algorithm));
        validation.leeway = 0;
        validation.validate_exp = enforce_expiry;
        validation.set_required_spec_claims(&["exp"]);

        decode::<AccessClaims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                JwtErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                JwtErrorKind::InvalidAlgorithm => TokenError::AlgorithmMismatch,
                JwtErrorKind::InvalidToken
                | JwtErrorKind::Base64(_)
                | JwtErrorKind::Json(_)
                | JwtErrorKind::Utf8(_)
                | JwtErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
                _ => {
                    error!(error = %e, "Unexpected token verification failure");
                    TokenError::SignatureInvalid
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::KeyMaterial;

    const PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_private.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_public.pem");
    const OTHER_PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_other_private.pem");
    const OTHER_PUBLIC_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_other_public.pem");

    fn hs256(secret: &[u8]) -> TokenSigner {
        let ring = KeyRing::new(KeyMaterial::Secret(secret.to_vec())).unwrap();
        TokenSigner::new(Arc::new(ring), Duration::minutes(15))
    }

    fn rs256() -> TokenSigner {
        let ring = KeyRing::new(KeyMaterial::Rsa {
            private_pem: PRIVATE_PEM.to_vec(),
            public_pem: PUBLIC_PEM.to_vec(),
        })
        .unwrap();
        TokenSigner::new(Arc::new(ring), Duration::minutes(15))
    }

    fn claims(exp_offset: Duration) -> AccessClaims {
        AccessClaims {
            id: 7,
            username: "alice".to_string(),
            is_staff: false,
            exp: (Utc::now() + exp_offset).timestamp(),
        }
    }

    fn segment(value: serde_json::Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_round_trip() {
        let signer = hs256(&[1u8; 32]);
        let original = claims(Duration::minutes(5));
        let token = signer.issue(&original).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));
        assert_eq!(signer.verify(&token).unwrap(), original);
    }

    #[test]
    fn test_header_shape() {
        let token = hs256(&[1u8; 32]).issue(&claims(Duration::minutes(5))).unwrap();
        let header_segment = token.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_segment).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_expired_is_distinct() {
        let signer = hs256(&[1u8; 32]);
        let token = signer.issue(&claims(Duration::minutes(-5))).unwrap();
        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
        assert_eq!(signer.verify_allow_expired(&token).unwrap().id, 7);
    }

    #[test]
    fn test_expired_with_bad_signature_is_not_expired() {
        let token = hs256(&[1u8; 32]).issue(&claims(Duration::minutes(-5))).unwrap();
        let other = hs256(&[2u8; 32]);
        assert_eq!(other.verify(&token), Err(TokenError::SignatureInvalid));
        assert_eq!(other.verify_allow_expired(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_every_single_byte_mutation_fails() {
        let signer = hs256(&[1u8; 32]);
        let token = signer.issue(&claims(Duration::minutes(5))).unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(bytes).unwrap();

            let result = signer.verify(&mutated);
            assert!(result.is_err(), "mutation at {i} verified");
            assert_ne!(result, Err(TokenError::Expired), "mutation at {i}");
        }
    }

    #[test]
    fn test_wrong_segment_count() {
        let signer = hs256(&[1u8; 32]);
        assert_eq!(signer.verify(""), Err(TokenError::Malformed));
        assert_eq!(signer.verify("a.b"), Err(TokenError::Malformed));
        assert_eq!(signer.verify("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(signer.verify("!!.b.c"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_alg_none_rejected() {
        let signer = hs256(&[1u8; 32]);
        let payload = serde_json::to_value(claims(Duration::minutes(5))).unwrap();
        let token = format!(
            "{}.{}.",
            segment(serde_json::json!({"alg": "none", "typ": "JWT"})),
            segment(payload)
        );
        assert_eq!(signer.verify(&token), Err(TokenError::AlgorithmMismatch));
        assert_eq!(signer.verify_allow_expired(&token), Err(TokenError::AlgorithmMismatch));
    }

    #[test]
    fn test_algorithm_downgrade_rejected() {
        // An HS256 token signed with the RSA public key as the secret.
        let rsa = rs256();
        let forged = hs256(PUBLIC_PEM).issue(&claims(Duration::minutes(5))).unwrap();
        assert_eq!(rsa.verify(&forged), Err(TokenError::AlgorithmMismatch));

        let rsa_token = rsa.issue(&claims(Duration::minutes(5))).unwrap();
        assert_eq!(
            hs256(&[1u8; 32]).verify(&rsa_token),
            Err(TokenError::AlgorithmMismatch)
        );
    }

    #[test]
    fn test_rs256_round_trip_and_public_key() {
        let signer = rs256();
        let original = claims(Duration::minutes(5));
        let token = signer.issue(&original).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), original);
        assert!(signer.public_key_pem().is_some());
    }

    #[test]
    fn test_rotation_invalidates_old_signatures() {
        let signer = rs256();
        let old = signer.issue(&claims(Duration::minutes(5))).unwrap();

        signer
            .key_ring()
            .rotate(KeyMaterial::Rsa {
                private_pem: OTHER_PRIVATE_PEM.to_vec(),
                public_pem: OTHER_PUBLIC_PEM.to_vec(),
            })
            .unwrap();

        assert_eq!(signer.verify(&old), Err(TokenError::SignatureInvalid));
        let fresh = signer.issue(&claims(Duration::minutes(5))).unwrap();
        assert!(signer.verify(&fresh).is_ok());
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let signer = hs256(&[1u8; 32]);
        let keys = signer.keys.snapshot();
        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &serde_json::json!({"id": 1, "username": "a", "is_staff": false}),
            &keys.encoding,
        )
        .unwrap();
        assert_eq!(signer.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_issue_access_uses_ttl() {
        let signer = hs256(&[1u8; 32]);
        let credential = Credential {
            id: 3,
            username: "bob".to_string(),
            password_hash: String::new(),
            is_active: true,
            is_staff: true,
            is_superuser: false,
            last_login: None,
        };
        let issued = signer.issue_access(&credential).unwrap();
        let claims = signer.verify(&issued.token).unwrap();
        assert_eq!(claims.id, 3);
        assert!(claims.is_staff);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert!(issued.expires_at > Utc::now() + Duration::minutes(14));
    }

    #[test]
    fn test_from_config_rejects_oversized_ttl() {
        let config = AuthConfig {
            jwt_secret: "x".repeat(32),
            access_ttl_minutes: u64::MAX,
            ..AuthConfig::default()
        };
        let err = TokenSigner::from_config(&config).unwrap_err();
        assert!(err.message.contains("access_ttl_minutes"));
    }
}
