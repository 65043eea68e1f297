//! Denylist of revoked refresh token identifiers.
//!
//! Entries only need to outlive the token they revoke, so each row carries the
//! token's own expiry and is purged after it.

use sqlx::sqlite::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct RevokedTokenStore {
    pool: SqlitePool,
}

impl RevokedTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a jti as revoked. Returns false if it was already revoked.
    pub async fn revoke(&self, jti: &str, expires_at: u64) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?, ?)")
                .bind(jti)
                .bind(i64::try_from(expires_at).unwrap_or(i64::MAX))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_revoked(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Delete entries whose token has expired anyway.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
