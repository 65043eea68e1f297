//! Refresh token exchange.

use tracing::{info, warn};

use super::errors::AuthError;
use super::header;
use super::types::UserContext;
use super::verifier::TokenVerifier;
use crate::db::UserStore;
use crate::jwt::{AccessToken, JwtConfig, RefreshToken};

/// Parse the refresh token carried in an Authorization header value.
pub fn refresh_token_from_header(
    header_value: &str,
    jwt: &JwtConfig,
) -> Result<RefreshToken, AuthError> {
    let raw = header::extract(header_value)?;
    RefreshToken::create(raw, jwt)?.ok_or(AuthError::WrongTokenType)
}

/// Exchange a refresh token for a fresh access token.
///
/// The token must parse, carry the refresh scope, pass the revocation check,
/// and its subject must still resolve to a principal with at least one role.
/// Nothing is retained between attempts.
pub async fn refresh_access_token(
    header_value: &str,
    jwt: &JwtConfig,
    verifier: &TokenVerifier,
    users: &UserStore,
) -> Result<AccessToken, AuthError> {
    let refresh = refresh_token_from_header(header_value, jwt)?;

    if !verifier.verify(refresh.jti()).await? {
        warn!(jti = %refresh.jti(), "Rejected revoked refresh token");
        return Err(AuthError::RevokedToken);
    }

    let user = users
        .get_by_username(refresh.subject())
        .await?
        .ok_or(AuthError::PrincipalNotFound)?;

    let context = UserContext::from_principal(&user)?;
    let access = jwt.create_access_token(&context)?;

    info!(username = %context.username, "Access token refreshed");
    Ok(access)
}
