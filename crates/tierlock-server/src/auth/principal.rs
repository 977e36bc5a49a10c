//! Principal resolution from request headers.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use tierlock_core::Principal;

use super::jwt::JwtManager;

/// A credential was presented but could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed authorization header")]
    MalformedHeader,

    #[error("Invalid token")]
    InvalidToken,
}

/// Resolve the caller from an `Authorization: Bearer` header.
///
/// No header means anonymous (`Ok(None)`). A header that is present but
/// unusable is an error, never a silent downgrade to anonymous.
pub fn bearer_principal(
    jwt: &JwtManager,
    headers: &HeaderMap,
) -> Result<Option<Principal>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::MalformedHeader)?;

    let claims = jwt.validate(token).map_err(|_| AuthError::InvalidToken)?;
    Ok(Some(claims.principal()))
}
