use std::collections::HashMap;
use std::sync::RwLock;

use clavis_core::UserId;

use super::{ReadModelError, UserReadStore, UserRecord};

/// In-memory user read store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryUserReadStore {
    records: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserReadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserReadStore for InMemoryUserReadStore {
    fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, ReadModelError> {
        let records = self
            .records
            .read()
            .map_err(|_| ReadModelError::Storage("lock poisoned".to_string()))?;
        Ok(records.get(&user_id).cloned())
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, ReadModelError> {
        let records = self
            .records
            .read()
            .map_err(|_| ReadModelError::Storage("lock poisoned".to_string()))?;
        Ok(records.values().find(|r| r.username == username).cloned())
    }

    fn upsert(&self, record: UserRecord) -> Result<(), ReadModelError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| ReadModelError::Storage("lock poisoned".to_string()))?;
        records.insert(record.user_id, record);
        Ok(())
    }
}
