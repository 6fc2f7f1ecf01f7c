//! In-process store implementations for tests and single-node tooling.

pub mod credential;
pub mod session;

pub use credential::MemoryCredentialStore;
pub use session::MemorySessionBackend;
