mod profile;
mod session;

use axum::Router;
use std::sync::Arc;

use crate::auth::{AuthProvider, TokenVerifier};
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use profile::ProfileState;
pub use session::SessionState;

/// Create the router for `/auth` session endpoints.
pub fn create_auth_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    verifier: TokenVerifier,
    authenticator: AuthProvider,
    rate_limit_config: RateLimitConfig,
) -> Router {
    session::router(SessionState {
        users: db.users(),
        jwt,
        verifier,
        authenticator,
        rate_limit_config,
    })
}

/// Create the router for `/api` endpoints, all requiring an access token.
pub fn create_api_router(jwt: Arc<JwtConfig>) -> Router {
    profile::router(ProfileState { jwt })
}
