//! Postgres-backed refresh token repository.
//!
//! `rotate` runs store-new-then-revoke-old in one transaction, so a crash
//! can briefly leave two valid tokens but never zero.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use clavis_core::UserId;
use clavis_tokens::{RefreshToken, TokenError, TokenRepository};

#[derive(Debug, Clone)]
pub struct PostgresTokenRepository {
    pool: Arc<PgPool>,
}

#[derive(Debug)]
struct RefreshTokenRow {
    token: String,
    user_id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for RefreshTokenRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(RefreshTokenRow {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            issued_at: row.try_get("issued_at")?,
            expires_at: row.try_get("expires_at")?,
            revoked: row.try_get("revoked")?,
        })
    }
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            token: row.token,
            user_id: UserId::from_uuid(row.user_id),
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked: row.revoked,
        }
    }
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, token), fields(user_id = %token.user_id), err)]
    pub async fn store_token(&self, token: &RefreshToken) -> Result<(), TokenError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id.as_uuid())
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&*self.pool)
        .await
        .map_err(|e| TokenError::Repository(format!("store: {e}")))?;
        Ok(())
    }

    pub async fn fetch_token(&self, token: &str) -> Result<RefreshToken, TokenError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT token, user_id, issued_at, expires_at, revoked
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| TokenError::Repository(format!("get: {e}")))?;

        row.map(RefreshToken::from).ok_or(TokenError::NotFound)
    }

    pub async fn revoke_token(&self, token: &str) -> Result<(), TokenError> {
        // Idempotent: no-op when the token is unknown or already revoked.
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1")
            .bind(token)
            .execute(&*self.pool)
            .await
            .map_err(|e| TokenError::Repository(format!("revoke: {e}")))?;
        Ok(())
    }

    #[instrument(skip(self, new), fields(user_id = %new.user_id), err)]
    pub async fn rotate_tokens(&self, old_token: &str, new: &RefreshToken) -> Result<(), TokenError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TokenError::Repository(format!("begin: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&new.token)
        .bind(new.user_id.as_uuid())
        .bind(new.issued_at)
        .bind(new.expires_at)
        .bind(new.revoked)
        .execute(&mut *tx)
        .await
        .map_err(|e| TokenError::Repository(format!("rotate/store: {e}")))?;

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1")
            .bind(old_token)
            .execute(&mut *tx)
            .await
            .map_err(|e| TokenError::Repository(format!("rotate/revoke: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| TokenError::Repository(format!("commit: {e}")))?;
        Ok(())
    }
}

impl TokenRepository for PostgresTokenRepository {
    fn store(&self, token: &RefreshToken) -> Result<(), TokenError> {
        runtime_handle()?.block_on(self.store_token(token))
    }

    fn get(&self, token: &str) -> Result<RefreshToken, TokenError> {
        runtime_handle()?.block_on(self.fetch_token(token))
    }

    fn revoke(&self, token: &str) -> Result<(), TokenError> {
        runtime_handle()?.block_on(self.revoke_token(token))
    }

    fn rotate(&self, old_token: &str, new: &RefreshToken) -> Result<(), TokenError> {
        runtime_handle()?.block_on(self.rotate_tokens(old_token, new))
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, TokenError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        TokenError::Repository("PostgresTokenRepository requires a tokio runtime context".to_string())
    })
}
