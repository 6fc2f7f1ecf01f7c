//! Row types for the credential and session tables.

pub mod credential;
pub mod profile;
pub mod session;

pub use credential::{Credential, NewCredential};
pub use profile::{ProfileField, ProfileUpdate};
pub use session::{SessionPurpose, SessionRecord, SessionState};
