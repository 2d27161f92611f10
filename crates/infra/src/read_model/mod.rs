//! Query-side storage for projected user records.
//!
//! Read models are disposable: they hold no authoritative state and can be
//! rebuilt from the event log at any time.

mod in_memory;
mod postgres;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use clavis_core::UserId;

pub use in_memory::InMemoryUserReadStore;
pub use postgres::PostgresUserReadStore;

/// Projected user record, denormalized for credential lookup by username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,

    /// Highest stream sequence number folded into this record. The
    /// projector's idempotency guard: duplicates at or below this version
    /// are dropped.
    pub applied_version: u64,
}

#[derive(Debug, Error)]
pub enum ReadModelError {
    #[error("read model storage failure: {0}")]
    Storage(String),
}

/// User read model store.
///
/// `upsert` replaces the whole record; the projection layer above decides
/// whether an incoming event may be applied at all.
pub trait UserReadStore: Send + Sync {
    fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, ReadModelError>;

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, ReadModelError>;

    fn upsert(&self, record: UserRecord) -> Result<(), ReadModelError>;
}

impl<S> UserReadStore for Arc<S>
where
    S: UserReadStore + ?Sized,
{
    fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, ReadModelError> {
        (**self).get(user_id)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, ReadModelError> {
        (**self).get_by_username(username)
    }

    fn upsert(&self, record: UserRecord) -> Result<(), ReadModelError> {
        (**self).upsert(record)
    }
}
