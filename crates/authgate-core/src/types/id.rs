//! Identifier types.

/// Primary key of a user row (`users.id`, a `BIGSERIAL`).
///
/// Kept as a plain integer because it is embedded verbatim in the
/// access-token payload as a JSON number.
pub type UserId = i64;
