//! Users projection: folds `UserRegistered` events into [`UserRecord`]s.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use clavis_core::UserId;
use clavis_events::{EventEnvelope, EventRegistry, Projection, RegistryError};
use clavis_identity::UserEvent;

use crate::read_model::{ReadModelError, UserReadStore, UserRecord};

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The stored `event_type` is not in the registry, or the payload does
    /// not decode. Registry/version skew must surface, not drop events.
    #[error("event decode failed: {0}")]
    Decode(RegistryError),

    /// The envelope arrived ahead of the record's `applied_version`.
    /// Redeliverable: the missing predecessor has not been applied yet.
    #[error("out-of-order delivery: applied_version={applied}, received={received}")]
    OutOfOrder { applied: u64, received: u64 },

    #[error(transparent)]
    ReadModel(#[from] ReadModelError),
}

/// Projects user events into the user read store.
///
/// At-least-once delivery semantics:
/// - duplicates (sequence at or below `applied_version`) are a silent no-op
/// - gaps (sequence beyond `applied_version + 1`) are an error, so the bus
///   redelivers once the predecessor lands
#[derive(Clone)]
pub struct UsersProjection<S> {
    store: S,
    registry: Arc<EventRegistry<UserEvent>>,
}

impl<S> UsersProjection<S>
where
    S: UserReadStore,
{
    pub fn new(store: S, registry: Arc<EventRegistry<UserEvent>>) -> Self {
        Self { store, registry }
    }

    fn applied_version(&self, user_id: UserId) -> Result<u64, ProjectionError> {
        Ok(self
            .store
            .get(user_id)?
            .map(|r| r.applied_version)
            .unwrap_or(0))
    }
}

impl<S> Projection for UsersProjection<S>
where
    S: UserReadStore,
{
    type Error = ProjectionError;

    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        let event = self
            .registry
            .decode(envelope.event_type(), envelope.payload())
            .map_err(ProjectionError::Decode)?;

        match event {
            UserEvent::Registered(e) => {
                let applied = self.applied_version(e.user_id)?;
                let received = envelope.sequence_number();

                if received <= applied {
                    debug!(
                        user_id = %e.user_id,
                        applied, received,
                        "duplicate delivery, skipping"
                    );
                    return Ok(());
                }
                if received != applied + 1 {
                    return Err(ProjectionError::OutOfOrder { applied, received });
                }

                self.store.upsert(UserRecord {
                    user_id: e.user_id,
                    username: e.username,
                    password_hash: e.password_hash,
                    created_at: e.occurred_at,
                    applied_version: received,
                })?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use clavis_identity::{USER_AGGREGATE_TYPE, USER_REGISTERED, UserRegistered, register_events};

    use crate::read_model::InMemoryUserReadStore;

    fn registry() -> Arc<EventRegistry<UserEvent>> {
        let mut registry = EventRegistry::new();
        register_events(&mut registry).unwrap();
        Arc::new(registry)
    }

    fn registered_envelope(user_id: UserId, sequence: u64) -> EventEnvelope<JsonValue> {
        let event = UserEvent::Registered(UserRegistered {
            user_id,
            username: "alice".to_string(),
            password_hash: "h".to_string(),
            occurred_at: Utc::now(),
        });
        EventEnvelope::new(
            Uuid::now_v7(),
            user_id.into(),
            USER_AGGREGATE_TYPE,
            sequence,
            USER_REGISTERED,
            Utc::now(),
            serde_json::to_value(&event).unwrap(),
        )
    }

    #[test]
    fn registered_event_creates_the_record() {
        let store = Arc::new(InMemoryUserReadStore::new());
        let projection = UsersProjection::new(store.clone(), registry());
        let user_id = UserId::new();

        projection.apply(&registered_envelope(user_id, 1)).unwrap();

        let record = store.get(user_id).unwrap().unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.applied_version, 1);
        assert_eq!(store.get_by_username("alice").unwrap(), Some(record));
    }

    #[test]
    fn duplicate_delivery_is_a_no_op() {
        let store = Arc::new(InMemoryUserReadStore::new());
        let projection = UsersProjection::new(store.clone(), registry());
        let user_id = UserId::new();

        projection.apply(&registered_envelope(user_id, 1)).unwrap();
        let before = store.get(user_id).unwrap().unwrap();

        // Redelivery of the same sequence number changes nothing.
        projection.apply(&registered_envelope(user_id, 1)).unwrap();
        assert_eq!(store.get(user_id).unwrap().unwrap(), before);
    }

    #[test]
    fn gap_is_an_error_for_redelivery() {
        let store = Arc::new(InMemoryUserReadStore::new());
        let projection = UsersProjection::new(store.clone(), registry());
        let user_id = UserId::new();

        let err = projection
            .apply(&registered_envelope(user_id, 3))
            .unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::OutOfOrder {
                applied: 0,
                received: 3
            }
        ));
        // Nothing written on a gap.
        assert!(store.get(user_id).unwrap().is_none());
    }

    #[test]
    fn unknown_event_type_surfaces_as_decode_error() {
        let store = Arc::new(InMemoryUserReadStore::new());
        let projection = UsersProjection::new(store, registry());

        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            UserId::new().into(),
            USER_AGGREGATE_TYPE,
            1,
            "UserRenamed",
            Utc::now(),
            serde_json::json!({}),
        );

        let err = projection.apply(&envelope).unwrap_err();
        assert!(matches!(err, ProjectionError::Decode(_)));
    }
}
