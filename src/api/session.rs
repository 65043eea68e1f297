//! Session endpoints.
//!
//! - POST `/login` - Exchange username and password for an access/refresh token pair
//! - GET `/token` - Exchange a refresh token for a new access token
//! - POST `/logout` - Revoke a refresh token

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{
    AuthError, AuthProvider, Authenticator, Credentials, TokenVerifier, authorization_header,
    refresh_access_token, refresh_token_from_header,
};
use crate::db::UserStore;
use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct SessionState {
    pub users: UserStore,
    pub jwt: Arc<JwtConfig>,
    pub verifier: TokenVerifier,
    pub authenticator: AuthProvider,
    pub rate_limit_config: RateLimitConfig,
}

pub fn router(state: SessionState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login).fallback(login_method_not_supported))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    let token_router = Router::new()
        .route("/token", get(refresh_token))
        .route("/logout", post(logout))
        .with_state(state);

    Router::new().merge(login_router).merge(token_router)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    refresh_token: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
struct LogoutResponse {
    revoked: bool,
}

async fn login(
    State(state): State<SessionState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(credentials) = payload.map_err(|_| AuthError::CredentialsNotProvided)?;

    let user = state
        .authenticator
        .authenticate(&credentials)
        .await
        .inspect_err(|e| {
            warn!(username = %credentials.username, case = e.case(), "Login failed");
        })?;

    let access = state.jwt.create_access_token(&user)?;
    let refresh = state.jwt.create_refresh_token(&user)?;

    info!(username = %user.username, jti = %refresh.jti(), "Login succeeded");

    Ok(Json(LoginResponse {
        token: access.token().to_string(),
        refresh_token: refresh.token().to_string(),
    }))
}

async fn login_method_not_supported() -> AuthError {
    AuthError::UnsupportedAuthMethod
}

/// Issue a new access token for the refresh token in the Authorization header.
async fn refresh_token(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AuthError> {
    let header_value = authorization_header(&headers)?;

    let access = refresh_access_token(header_value, &state.jwt, &state.verifier, &state.users)
        .await
        .inspect_err(|e| warn!(case = e.case(), "Token refresh rejected"))?;

    Ok(Json(TokenResponse {
        token: access.token().to_string(),
    }))
}

/// Revoke the refresh token in the Authorization header.
/// Only the denylist strategy records anything.
async fn logout(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AuthError> {
    let refresh = refresh_token_from_header(authorization_header(&headers)?, &state.jwt)?;

    let revoked = state
        .verifier
        .revoke(refresh.jti(), refresh.expires_at())
        .await?;

    info!(
        username = %refresh.subject(),
        jti = %refresh.jti(),
        strategy = state.verifier.name(),
        revoked,
        "Logout"
    );

    Ok(Json(LogoutResponse { revoked }))
}
