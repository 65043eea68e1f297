//! JWT authentication.
//!
//! Dual-token system: short-lived access tokens carry the caller's
//! authorities and are checked statelessly on every request; long-lived
//! refresh tokens carry only the refresh scope and a jti, and are exchanged
//! for new access tokens at `/auth/token`.

mod errors;
mod extractors;
mod header;
mod ip;
mod provider;
mod refresh;
mod state;
mod types;
mod verifier;

pub use errors::{
    AuthError, ERR_INTERNAL_SERVER_ERROR, ERR_INVALID_CREDENTIALS, ERR_METHOD_NOT_SUPPORTED,
    ERR_TOKEN_EXPIRED, ERR_VALIDATION_FAILED,
};
pub use extractors::Auth;
pub use header::{HEADER_PREFIX, authorization_header, extract, extract_from_headers};
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use provider::{AuthMethod, AuthProvider, Authenticator, Credentials, PasswordAuthenticator};
pub use refresh::{refresh_access_token, refresh_token_from_header};
pub use state::HasAuthBackend;
pub use types::UserContext;
pub use verifier::TokenVerifier;
