//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::JwtError;

/// Error codes reported in the `errorCode` field of failure responses.
pub const ERR_INVALID_CREDENTIALS: &str = "error.invalidCredentials";
pub const ERR_TOKEN_EXPIRED: &str = "error.tokenExpired";
pub const ERR_METHOD_NOT_SUPPORTED: &str = "error.methodNotSupported";
pub const ERR_VALIDATION_FAILED: &str = "error.validationFailed";
pub const ERR_INTERNAL_SERVER_ERROR: &str = "error.internalServerError";

/// Every way authentication can fail.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header is missing or malformed")]
    MissingOrMalformedHeader,
    #[error("token is malformed")]
    MalformedToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    ExpiredToken,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("token has been revoked")]
    RevokedToken,
    #[error("principal not found")]
    PrincipalNotFound,
    #[error("username or password not valid")]
    BadCredentials,
    #[error("principal has no roles assigned")]
    NoAuthoritiesAssigned,
    #[error("authentication method not supported")]
    UnsupportedAuthMethod,
    #[error("username or password not provided")]
    CredentialsNotProvided,
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("token error: {0}")]
    Token(JwtError),
    #[error("password verification task failed: {0}")]
    Verification(tokio::task::JoinError),
}

impl AuthError {
    /// Stable name of the failure case, reported in the `error` field.
    pub fn case(&self) -> &'static str {
        match self {
            Self::MissingOrMalformedHeader => "MISSING_OR_MALFORMED_HEADER",
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::WrongTokenType => "WRONG_TOKEN_TYPE",
            Self::RevokedToken => "REVOKED_TOKEN",
            Self::PrincipalNotFound => "PRINCIPAL_NOT_FOUND",
            Self::BadCredentials => "BAD_CREDENTIALS",
            Self::NoAuthoritiesAssigned => "NO_AUTHORITIES_ASSIGNED",
            Self::UnsupportedAuthMethod => "UNSUPPORTED_AUTH_METHOD",
            Self::CredentialsNotProvided => "CREDENTIALS_NOT_PROVIDED",
            Self::Database(_) | Self::Token(_) | Self::Verification(_) => "INTERNAL",
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadCredentials | Self::PrincipalNotFound => ERR_INVALID_CREDENTIALS,
            Self::ExpiredToken => ERR_TOKEN_EXPIRED,
            Self::UnsupportedAuthMethod => ERR_METHOD_NOT_SUPPORTED,
            Self::Database(_) | Self::Token(_) | Self::Verification(_) => {
                ERR_INTERNAL_SERVER_ERROR
            }
            _ => ERR_VALIDATION_FAILED,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Token(_) | Self::Verification(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::MissingOrMalformedHeader => "Authorization header cannot be blank or malformed",
            Self::MalformedToken => "Invalid token",
            Self::InvalidSignature => "Invalid token",
            Self::ExpiredToken => "Token has expired",
            Self::WrongTokenType => "Wrong token type",
            Self::RevokedToken => "Token has been revoked",
            Self::PrincipalNotFound => "User not found",
            Self::BadCredentials => "Authentication failed. Username or password not valid",
            Self::NoAuthoritiesAssigned => "User has no roles assigned",
            Self::UnsupportedAuthMethod => "Authentication method not supported",
            Self::CredentialsNotProvided => "Username or password not provided",
            Self::Database(_) | Self::Token(_) | Self::Verification(_) => "Internal server error",
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Malformed => Self::MalformedToken,
            JwtError::InvalidSignature => Self::InvalidSignature,
            JwtError::Expired => Self::ExpiredToken,
            JwtError::WrongTokenType => Self::WrongTokenType,
            other => Self::Token(other),
        }
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Verification(e)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error_code: &'static str,
    error: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => tracing::error!(error = %e, "Authentication database error"),
            Self::Token(e) => tracing::error!(error = %e, "Token issuance failed"),
            Self::Verification(e) => tracing::error!(error = %e, "Password verification failed"),
            other => tracing::debug!(case = other.case(), "Authentication rejected"),
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error_code: self.error_code(),
                error: self.case(),
                message: self.message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::BadCredentials.error_code(), ERR_INVALID_CREDENTIALS);
        assert_eq!(AuthError::ExpiredToken.error_code(), ERR_TOKEN_EXPIRED);
        assert_eq!(
            AuthError::UnsupportedAuthMethod.error_code(),
            ERR_METHOD_NOT_SUPPORTED
        );
        assert_eq!(AuthError::WrongTokenType.error_code(), ERR_VALIDATION_FAILED);
        assert_eq!(AuthError::RevokedToken.error_code(), ERR_VALIDATION_FAILED);
    }

    #[test]
    fn test_auth_failures_are_unauthorized() {
        for err in [
            AuthError::MissingOrMalformedHeader,
            AuthError::MalformedToken,
            AuthError::InvalidSignature,
            AuthError::ExpiredToken,
            AuthError::WrongTokenType,
            AuthError::RevokedToken,
            AuthError::PrincipalNotFound,
            AuthError::BadCredentials,
            AuthError::NoAuthoritiesAssigned,
            AuthError::UnsupportedAuthMethod,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{}", err);
        }
    }

    #[tokio::test]
    async fn test_failed_verification_task_is_internal() {
        let join_error = tokio::task::spawn_blocking(|| -> bool { panic!("hasher crashed") })
            .await
            .unwrap_err();
        let err = AuthError::from(join_error);

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), ERR_INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_jwt_errors_map_to_cases() {
        assert!(matches!(
            AuthError::from(JwtError::Expired),
            AuthError::ExpiredToken
        ));
        assert!(matches!(
            AuthError::from(JwtError::TimeError),
            AuthError::Token(_)
        ));
    }
}
