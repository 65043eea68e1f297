//! Profile of the authenticated caller.

use axum::{Json, Router, routing::get};
use std::sync::Arc;

use crate::auth::{Auth, UserContext};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct ProfileState {
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(ProfileState);

pub fn router(state: ProfileState) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .route("/me", get(whoami))
        .with_state(state)
}

async fn whoami(Auth(user): Auth) -> Json<UserContext> {
    Json(user)
}
