//! Revocation checks for refresh token identifiers.
//!
//! Signature and expiry are checked elsewhere. The verifier only answers
//! whether a jti is known to be revoked, so the revocation strategy can be
//! swapped without touching token parsing.

use crate::db::RevokedTokenStore;

/// Revocation strategy, selected once at startup.
#[derive(Clone)]
pub enum TokenVerifier {
    /// Signature and expiry alone govern validity.
    AlwaysValid,
    /// Identifiers recorded in the denylist are rejected.
    Denylist(RevokedTokenStore),
}

impl TokenVerifier {
    /// `false` means the token must be rejected. `true` only means it is not
    /// known to be revoked.
    pub async fn verify(&self, jti: &str) -> Result<bool, sqlx::Error> {
        match self {
            TokenVerifier::AlwaysValid => Ok(true),
            TokenVerifier::Denylist(store) => Ok(!store.is_revoked(jti).await?),
        }
    }

    /// Record a jti as revoked until `expires_at`. Returns whether anything
    /// was recorded; `AlwaysValid` never records.
    pub async fn revoke(&self, jti: &str, expires_at: u64) -> Result<bool, sqlx::Error> {
        match self {
            TokenVerifier::AlwaysValid => Ok(false),
            TokenVerifier::Denylist(store) => store.revoke(jti, expires_at).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenVerifier::AlwaysValid => "always-valid",
            TokenVerifier::Denylist(_) => "denylist",
        }
    }
}
