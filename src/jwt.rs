//! JWT token issuance and validation.
//!
//! Access and refresh tokens share one claim shape: the `scopes` array holds
//! the caller's authorities on access tokens and only the refresh marker on
//! refresh tokens. That marker is what keeps the two kinds apart.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::UserContext;

/// Default access token lifetime: 5 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 5 * 60;

/// Default refresh token lifetime: 2 weeks.
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 14 * 24 * 60 * 60;

/// Longest lifetime either token may have: 1 year.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Reserved scopes carried in the `scopes` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    RefreshToken,
}

impl Scope {
    /// Authority-style spelling used inside the `scopes` claim.
    pub fn authority(&self) -> &'static str {
        match self {
            Scope::RefreshToken => "ROLE_REFRESH_TOKEN",
        }
    }
}

/// Signing configuration, loaded once at startup.
#[derive(Clone)]
pub struct JwtSettings {
    /// HMAC secret used for HS256.
    pub signing_key: Vec<u8>,
    /// Value of the `iss` claim; tokens from another issuer are rejected.
    pub issuer: String,
    /// Access token lifetime in seconds.
    pub access_ttl: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl: u64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("signing_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Claim set shared by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Authorities on access tokens, the refresh marker on refresh tokens.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// JWT ID, only present on refresh tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.iter().any(|s| s == scope.authority())
    }
}

/// A signed access token together with the claims it was signed with.
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: String,
    claims: Claims,
}

impl AccessToken {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Caller identity carried by the token.
    pub fn user_context(&self) -> UserContext {
        UserContext::new(self.claims.sub.clone(), self.claims.scopes.clone())
    }
}

/// A refresh token: signed, carries a jti and the refresh scope.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    token: String,
    claims: Claims,
    jti: String,
}

impl RefreshToken {
    /// Parse `raw` and accept it only if it carries the refresh scope.
    ///
    /// Cryptographic and expiry failures are errors; a valid token of the
    /// wrong kind yields `Ok(None)`.
    pub fn create(raw: &str, jwt: &JwtConfig) -> Result<Option<Self>, JwtError> {
        let claims = jwt.parse(raw)?;

        if !claims.has_scope(Scope::RefreshToken) {
            return Ok(None);
        }

        let Some(jti) = claims.jti.clone() else {
            return Err(JwtError::Malformed);
        };

        Ok(Some(Self {
            token: raw.to_string(),
            claims,
            jti,
        }))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn jti(&self) -> &str {
        &self.jti
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn expires_at(&self) -> u64 {
        self.claims.exp
    }
}

/// Token factory and parser bound to one signing key.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: u64,
    refresh_ttl: u64,
}

impl JwtConfig {
    /// Derive signing keys from the settings.
    pub fn new(settings: &JwtSettings) -> Result<Self, JwtError> {
        if settings.signing_key.is_empty() {
            return Err(JwtError::Configuration("signing key is empty"));
        }
        if settings.access_ttl == 0 || settings.refresh_ttl == 0 {
            return Err(JwtError::Configuration("token lifetimes must be positive"));
        }
        if settings.access_ttl > MAX_TTL_SECS || settings.refresh_ttl > MAX_TTL_SECS {
            return Err(JwtError::Configuration("token lifetimes must not exceed one year"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&settings.signing_key),
            decoding_key: DecodingKey::from_secret(&settings.signing_key),
            issuer: settings.issuer.clone(),
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
        })
    }

    /// Issue an access token carrying the user's authorities.
    pub fn create_access_token(&self, user: &UserContext) -> Result<AccessToken, JwtError> {
        let now = unix_now()?;

        let claims = Claims {
            sub: user.username.clone(),
            iss: self.issuer.clone(),
            iat: now,
            exp: expiry(now, self.access_ttl)?,
            scopes: user.authorities.clone(),
            jti: None,
        };

        let token = self.sign(&claims)?;
        Ok(AccessToken { token, claims })
    }

    /// Issue a refresh token. It carries only the refresh scope, never the
    /// user's authorities.
    pub fn create_refresh_token(&self, user: &UserContext) -> Result<RefreshToken, JwtError> {
        let now = unix_now()?;
        let jti = uuid::Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user.username.clone(),
            iss: self.issuer.clone(),
            iat: now,
            exp: expiry(now, self.refresh_ttl)?,
            scopes: vec![Scope::RefreshToken.authority().to_string()],
            jti: Some(jti.clone()),
        };

        let token = self.sign(&claims)?;
        Ok(RefreshToken { token, claims, jti })
    }

    /// Verify signature, expiry and claim shape, returning the claims as signed.
    pub fn parse(&self, raw: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        jsonwebtoken::decode::<Claims>(raw, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Parse a token that must be an access token.
    pub fn parse_access_token(&self, raw: &str) -> Result<AccessToken, JwtError> {
        let claims = self.parse(raw)?;

        if claims.has_scope(Scope::RefreshToken) || claims.jti.is_some() {
            return Err(JwtError::WrongTokenType);
        }

        Ok(AccessToken {
            token: raw.to_string(),
            claims,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

fn expiry(now: u64, ttl: u64) -> Result<u64, JwtError> {
    now.checked_add(ttl).ok_or(JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("invalid JWT configuration: {0}")]
    Configuration(&'static str),
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("system time error")]
    TimeError,
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("wrong token type")]
    WrongTokenType,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                JwtError::InvalidSignature
            }
            _ => JwtError::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secret: &[u8]) -> JwtSettings {
        JwtSettings {
            signing_key: secret.to_vec(),
            issuer: "mover-test".to_string(),
            access_ttl: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl: DEFAULT_REFRESH_TTL_SECS,
        }
    }

    fn config() -> JwtConfig {
        JwtConfig::new(&settings(b"test-secret-key-for-testing")).unwrap()
    }

    fn alice() -> UserContext {
        UserContext::new("alice".to_string(), vec!["ADMIN".to_string(), "USER".to_string()])
    }

    fn encode_raw(secret: &[u8], claims: &Claims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let jwt = config();
        let issued = jwt.create_access_token(&alice()).unwrap();

        let claims = jwt.parse(issued.token()).unwrap();
        assert_eq!(&claims, issued.claims());
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.scopes, vec!["ADMIN", "USER"]);
        assert_eq!(claims.exp - claims.iat, DEFAULT_ACCESS_TTL_SECS);
        assert!(claims.jti.is_none());

        let parsed = jwt.parse_access_token(issued.token()).unwrap();
        assert_eq!(parsed.user_context(), alice());
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let jwt = config();
        let issued = jwt.create_refresh_token(&alice()).unwrap();

        let refresh = RefreshToken::create(issued.token(), &jwt).unwrap().unwrap();
        assert_eq!(refresh.subject(), "alice");
        assert_eq!(refresh.jti(), issued.jti());
        assert_eq!(
            refresh.claims().scopes,
            vec![Scope::RefreshToken.authority()]
        );
        assert_eq!(
            refresh.expires_at() - refresh.claims().iat,
            DEFAULT_REFRESH_TTL_SECS
        );
    }

    #[test]
    fn test_refresh_token_carries_no_authorities() {
        let jwt = config();
        let issued = jwt.create_refresh_token(&alice()).unwrap();

        assert!(!issued.claims().scopes.iter().any(|s| s == "ADMIN"));
    }

    #[test]
    fn test_unique_jti_per_refresh_token() {
        let jwt = config();

        let first = jwt.create_refresh_token(&alice()).unwrap();
        let second = jwt.create_refresh_token(&alice()).unwrap();

        assert_ne!(first.jti(), second.jti());
    }

    #[test]
    fn test_access_token_is_not_a_refresh_token() {
        let jwt = config();
        let access = jwt.create_access_token(&alice()).unwrap();

        let result = RefreshToken::create(access.token(), &jwt).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let jwt = config();
        let refresh = jwt.create_refresh_token(&alice()).unwrap();

        let result = jwt.parse_access_token(refresh.token());
        assert!(matches!(result, Err(JwtError::WrongTokenType)));
    }

    #[test]
    fn test_expired_token() {
        let secret = b"test-secret-key-for-testing";
        let now = unix_now().unwrap();

        let claims = Claims {
            sub: "alice".to_string(),
            iss: "mover-test".to_string(),
            iat: now - 100,
            exp: now - 1,
            scopes: vec!["USER".to_string()],
            jti: None,
        };
        let token = encode_raw(secret, &claims);

        let jwt = JwtConfig::new(&settings(secret)).unwrap();
        assert!(matches!(jwt.parse(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = JwtConfig::new(&settings(b"secret-1")).unwrap();
        let verifier = JwtConfig::new(&settings(b"secret-2")).unwrap();

        let token = issuer.create_access_token(&alice()).unwrap();
        assert!(matches!(
            verifier.parse(token.token()),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload() {
        let jwt = config();
        let token = jwt.create_access_token(&alice()).unwrap();
        let other = jwt
            .create_access_token(&UserContext::new("mallory".to_string(), vec![]))
            .unwrap();

        // Header and signature from one token, payload from another.
        let parts: Vec<&str> = token.token().split('.').collect();
        let other_parts: Vec<&str> = other.token().split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(jwt.parse(&forged), Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_malformed_token() {
        let jwt = config();
        assert!(matches!(jwt.parse("invalid-token"), Err(JwtError::Malformed)));
        assert!(matches!(jwt.parse("a.b.c"), Err(JwtError::Malformed)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let secret = b"test-secret-key-for-testing";
        let mut other = settings(secret);
        other.issuer = "someone-else".to_string();

        let token = JwtConfig::new(&other)
            .unwrap()
            .create_access_token(&alice())
            .unwrap();

        let jwt = JwtConfig::new(&settings(secret)).unwrap();
        assert!(matches!(jwt.parse(token.token()), Err(JwtError::Malformed)));
    }

    #[test]
    fn test_ttl_bounds() {
        let mut bad = settings(b"test-secret-key-for-testing");
        bad.access_ttl = u64::MAX;
        assert!(matches!(
            JwtConfig::new(&bad),
            Err(JwtError::Configuration(_))
        ));

        let mut bad = settings(b"test-secret-key-for-testing");
        bad.refresh_ttl = MAX_TTL_SECS + 1;
        assert!(matches!(
            JwtConfig::new(&bad),
            Err(JwtError::Configuration(_))
        ));

        let mut longest = settings(b"test-secret-key-for-testing");
        longest.access_ttl = MAX_TTL_SECS;
        longest.refresh_ttl = MAX_TTL_SECS;
        let jwt = JwtConfig::new(&longest).unwrap();
        let token = jwt.create_refresh_token(&alice()).unwrap();
        assert_eq!(token.expires_at() - token.claims().iat, MAX_TTL_SECS);
        assert!(jwt.parse(token.token()).is_ok());
    }

    #[test]
    fn test_empty_signing_key_is_configuration_error() {
        let result = JwtConfig::new(&settings(b""));
        assert!(matches!(result, Err(JwtError::Configuration(_))));
    }
}
