//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::state::HasAuthBackend;
use super::types::AuthenticatedAccount;
use crate::session::AuthError;

/// Pick the access token from the request: the cookie wins over an
/// `Authorization: Bearer` header when both are present.
pub fn access_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = get_cookie(headers, ACCESS_COOKIE_NAME).filter(|t| !t.is_empty()) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for endpoints that require a signed-in account.
///
/// Validates the access token and loads the account on every request. The
/// resolved account is also left in the request extensions.
pub struct Auth(pub AuthenticatedAccount);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<AuthenticatedAccount>() {
            return Ok(Auth(existing.clone()));
        }

        let token = access_token_from_headers(&parts.headers);
        let account = state.sessions().authorize(token).await.inspect_err(|e| {
            tracing::debug!(reason = %e, "Rejected request at auth gate");
        })?;

        let authenticated = AuthenticatedAccount { account };
        parts.extensions.insert(authenticated.clone());
        Ok(Auth(authenticated))
    }
}
