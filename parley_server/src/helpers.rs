use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::errors::AuthError;

/// Extracts the token from an `Authorization: Bearer <token>` header. The scheme is matched case-insensitively.
///
/// A missing header, or one that does not use the bearer scheme, is [`AuthError::MissingToken`].
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).ok_or(AuthError::MissingToken)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(AuthError::MissingToken)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}
