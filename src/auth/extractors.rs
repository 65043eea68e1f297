//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::AuthError;
use super::header::extract_from_headers;
use super::state::HasAuthBackend;
use super::types::UserContext;

/// Extractor for endpoints that require a valid access token.
/// Stateless: the caller's identity comes from the token claims alone.
pub struct Auth(pub UserContext);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = extract_from_headers(&parts.headers)?;
        let token = state.jwt().parse_access_token(raw)?;
        Ok(Auth(token.user_context()))
    }
}
