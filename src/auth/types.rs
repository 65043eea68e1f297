//! Authentication user types.

use serde::Serialize;

use super::errors::AuthError;
use crate::db::User;

/// Request-scoped identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContext {
    pub username: String,
    pub authorities: Vec<String>,
}

impl UserContext {
    pub fn new(username: String, authorities: Vec<String>) -> Self {
        Self {
            username,
            authorities,
        }
    }

    /// Project a stored principal onto a context, mapping roles to authorities.
    /// A principal without roles is a misconfiguration and cannot authenticate.
    pub fn from_principal(user: &User) -> Result<Self, AuthError> {
        if user.roles.is_empty() {
            return Err(AuthError::NoAuthoritiesAssigned);
        }

        let authorities = user
            .roles
            .iter()
            .map(|role| role.authority().to_string())
            .collect();

        Ok(Self::new(user.username.clone(), authorities))
    }
}
