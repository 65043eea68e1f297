//! Credential authentication.
//!
//! Each login method is one concrete authenticator; `AuthProvider` picks the
//! one named by the configured `AuthMethod`.

use serde::Deserialize;

use super::errors::AuthError;
use super::types::UserContext;
use crate::db::UserStore;
use crate::password::PasswordHasher;

/// Supported login methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AuthMethod {
    #[default]
    Password,
}

/// Username/password pair submitted to the login endpoint.
#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait Authenticator {
    /// Validate credentials and produce the caller's context.
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserContext, AuthError>;
}

/// Verifies passwords against the hashes in the user store.
#[derive(Clone)]
pub struct PasswordAuthenticator {
    users: UserStore,
    hasher: PasswordHasher,
}

impl PasswordAuthenticator {
    pub fn new(users: UserStore, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }
}

impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserContext, AuthError> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::CredentialsNotProvided);
        }

        let user = self
            .users
            .get_by_username(&credentials.username)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        let hasher = self.hasher.clone();
        let password = credentials.password.clone();
        let stored_hash = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash)).await?;

        if !matches {
            return Err(AuthError::BadCredentials);
        }

        UserContext::from_principal(&user)
    }
}

/// The configured authenticator.
#[derive(Clone)]
pub enum AuthProvider {
    Password(PasswordAuthenticator),
}

impl AuthProvider {
    pub fn new(method: AuthMethod, users: UserStore) -> Self {
        match method {
            AuthMethod::Password => AuthProvider::Password(PasswordAuthenticator::new(
                users,
                PasswordHasher::default(),
            )),
        }
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            AuthProvider::Password(_) => AuthMethod::Password,
        }
    }
}

impl Authenticator for AuthProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserContext, AuthError> {
        match self {
            AuthProvider::Password(inner) => inner.authenticate(credentials).await,
        }
    }
}
