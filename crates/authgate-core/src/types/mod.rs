//! Core type definitions used across the authgate workspace.

pub mod id;

pub use id::UserId;
