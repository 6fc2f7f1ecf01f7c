//! # authgate-core
//!
//! Core crate for authgate. Contains configuration schemas, shared id
//! types, the unified error system, and helpers that bound every call into
//! an external store with a timeout.
//!
//! This crate has **no** internal dependencies on other authgate crates.

pub mod bounded;
pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
