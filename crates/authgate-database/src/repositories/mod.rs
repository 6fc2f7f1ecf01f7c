//! PostgreSQL implementations of the store traits.

pub mod credential;
pub mod session;

pub use credential::CredentialRepository;
pub use session::SessionRepository;
