//! Session lifecycle: record storage, login orchestration and cleanup.

pub mod cleanup;
pub mod manager;
pub mod store;

pub use cleanup::SessionCleanup;
pub use manager::{AuthSessionManager, TokenPair};
pub use store::{IssuedSession, RedeemOutcome, SessionStore};
