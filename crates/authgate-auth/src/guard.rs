//! `Authorization` header parsing.

/// Extracts the token from a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively. Returns `None` for any other
/// scheme or an empty token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty() && !token.contains(' ')).then_some(token)
}
