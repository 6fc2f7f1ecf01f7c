//! Bearer token issuance and verification.

pub mod claims;
pub mod keys;
pub mod signer;

pub use claims::AccessClaims;
pub use keys::{KeyMaterial, KeyRing};
pub use signer::{IssuedToken, TokenSigner};
