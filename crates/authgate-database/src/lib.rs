//! # authgate-database
//!
//! Durable state for authgate: the credential store and the session store
//! backend. Both are exposed as traits so the authentication core never
//! depends on a concrete database.
//!
//! - `repositories`: PostgreSQL implementations (sqlx)
//! - `memory`: in-process implementations for tests and single-node tooling
//! - `models`: row types shared by both

pub mod connection;
pub mod memory;
pub mod migration;
pub mod models;
pub mod repositories;
pub mod traits;

pub use connection::DatabasePool;
pub use memory::{MemoryCredentialStore, MemorySessionBackend};
pub use models::{
    Credential, NewCredential, ProfileField, ProfileUpdate, SessionPurpose, SessionRecord,
    SessionState,
};
pub use repositories::{CredentialRepository, SessionRepository};
pub use traits::{CredentialStore, SessionBackend};
