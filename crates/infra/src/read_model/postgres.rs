//! Postgres-backed user read store.
//!
//! Same sync-trait-over-async-inherent shape as the event store: the
//! [`UserReadStore`] trait methods block on the inherent `async fn`s via
//! the ambient tokio runtime handle.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use clavis_core::UserId;

use super::{ReadModelError, UserReadStore, UserRecord};

#[derive(Debug, Clone)]
pub struct PostgresUserReadStore {
    pool: Arc<PgPool>,
}

#[derive(Debug)]
struct UserRecordRow {
    user_id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    applied_version: i64,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for UserRecordRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRecordRow {
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            applied_version: row.try_get("applied_version")?,
        })
    }
}

impl From<UserRecordRow> for UserRecord {
    fn from(row: UserRecordRow) -> Self {
        UserRecord {
            user_id: UserId::from_uuid(row.user_id),
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
            applied_version: row.applied_version as u64,
        }
    }
}

impl PostgresUserReadStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn fetch(&self, user_id: UserId) -> Result<Option<UserRecord>, ReadModelError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, username, password_hash, created_at, applied_version
            FROM users_read
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| ReadModelError::Storage(format!("fetch: {e}")))?;

        row.map(parse_row).transpose()
    }

    #[instrument(skip(self), err)]
    pub async fn fetch_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, ReadModelError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, username, password_hash, created_at, applied_version
            FROM users_read
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| ReadModelError::Storage(format!("fetch_by_username: {e}")))?;

        row.map(parse_row).transpose()
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id), err)]
    pub async fn store(&self, record: UserRecord) -> Result<(), ReadModelError> {
        sqlx::query(
            r#"
            INSERT INTO users_read (user_id, username, password_hash, created_at, applied_version)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                username = EXCLUDED.username,
                password_hash = EXCLUDED.password_hash,
                created_at = EXCLUDED.created_at,
                applied_version = EXCLUDED.applied_version
            "#,
        )
        .bind(record.user_id.as_uuid())
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(record.created_at)
        .bind(record.applied_version as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| ReadModelError::Storage(format!("store: {e}")))?;

        Ok(())
    }
}

impl UserReadStore for PostgresUserReadStore {
    fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, ReadModelError> {
        runtime_handle()?.block_on(self.fetch(user_id))
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, ReadModelError> {
        runtime_handle()?.block_on(self.fetch_by_username(username))
    }

    fn upsert(&self, record: UserRecord) -> Result<(), ReadModelError> {
        runtime_handle()?.block_on(self.store(record))
    }
}

fn parse_row(row: sqlx::postgres::PgRow) -> Result<UserRecord, ReadModelError> {
    let parsed = UserRecordRow::from_row(&row)
        .map_err(|e| ReadModelError::Storage(format!("failed to deserialize user row: {e}")))?;
    Ok(parsed.into())
}

fn runtime_handle() -> Result<tokio::runtime::Handle, ReadModelError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        ReadModelError::Storage("PostgresUserReadStore requires a tokio runtime context".to_string())
    })
}
