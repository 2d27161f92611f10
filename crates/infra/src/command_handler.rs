//! Command execution pipeline (application-level orchestration).
//!
//! One command flows through:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from the store (empty for fresh aggregates)
//!   ↓
//! 2. Rehydrate the aggregate (registry-decoded history)
//!   ↓
//! 3. Handle the command (pure decision logic, buffers uncommitted events)
//!   ↓
//! 4. Append to the store (atomic, optimistic concurrency check)
//!   ↓
//! 5. Publish committed events to the bus, in order, then clear the buffer
//! ```
//!
//! Events are persisted before publication: if the append fails nothing is
//! published; if publication fails after a successful append the events
//! remain the durable source of truth and only the read projection lags
//! (at-least-once, surfaced as [`DispatchError::Publish`]). Version
//! conflicts are returned to the caller and never retried here — the
//! command contents may no longer be appropriate against the new state.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use clavis_core::{
    AggregateId, AggregateRoot, DeterministicIdGenerator, DomainError, ExpectedVersion, UserId,
};
use clavis_events::{EventBus, EventEnvelope, EventRegistry};
use clavis_identity::{RegisterUser, USER_AGGREGATE_TYPE, User, UserCommand, UserEvent};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent, decode_stream};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (stale aggregate version). Callers
    /// reload and retry; for deterministic user ids this is also how a
    /// taken username surfaces.
    #[error("conflict: {0}")]
    Concurrency(String),

    /// Domain validation failure (deterministic, user-correctable).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Domain invariant failure (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Domain-level not found.
    #[error("not found")]
    NotFound,

    /// Persisting to the event store failed.
    #[error("event store: {0}")]
    Store(EventStoreError),

    /// Publication failed after a successful append. The events are
    /// durable; the projection lags until redelivery.
    #[error("publish failed after append: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::AggregateNotFound(_) => DispatchError::NotFound,
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
        }
    }
}

/// Orchestrates user commands against the event-sourced write side.
///
/// Holds no in-process locks; correctness under concurrent commands relies
/// entirely on the store's atomic optimistic append (§ the store is the
/// sole write arbiter per aggregate).
pub struct UserCommandHandler<S, B> {
    store: S,
    bus: B,
    registry: Arc<EventRegistry<UserEvent>>,
    ids: DeterministicIdGenerator,
}

impl<S, B> UserCommandHandler<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        store: S,
        bus: B,
        registry: Arc<EventRegistry<UserEvent>>,
        ids: DeterministicIdGenerator,
    ) -> Self {
        Self {
            store,
            bus,
            registry,
            ids,
        }
    }

    /// Register a new user.
    ///
    /// The aggregate id is derived deterministically from the username, so
    /// two racing registrations of the same name target the same stream
    /// and exactly one wins the version-0 slot; the loser gets
    /// [`DispatchError::Concurrency`].
    ///
    /// On success the returned aggregate is at version 1 with its
    /// uncommitted buffer persisted, published and cleared.
    #[instrument(skip(self, password_hash), fields(username = %username), err)]
    pub fn handle_register_user(
        &self,
        username: &str,
        password_hash: String,
    ) -> Result<User, DispatchError> {
        // Canonical (trimmed) username keys the stream, matching what the
        // aggregate records in the event.
        let user_id = self.ids.user_id(username.trim());

        let mut user = User::empty(user_id);
        user.execute(&UserCommand::Register(RegisterUser {
            user_id,
            username: username.to_string(),
            password_hash,
            occurred_at: Utc::now(),
        }))?;

        self.commit(&mut user, ExpectedVersion::Exact(0))?;
        Ok(user)
    }

    /// Rehydrate a user aggregate from its full event stream.
    pub fn load_user(&self, user_id: UserId) -> Result<User, DispatchError> {
        let history = self.store.load_stream(user_id.into())?;
        validate_loaded_stream(user_id.into(), &history)?;

        let events = decode_stream(&self.registry, &history)?;
        User::reconstruct(user_id, &events).map_err(DispatchError::from)
    }

    /// Persist and publish the aggregate's uncommitted buffer, then clear
    /// it.
    fn commit(&self, user: &mut User, expected: ExpectedVersion) -> Result<(), DispatchError> {
        let uncommitted = user
            .uncommitted_events()
            .iter()
            .map(|event| {
                UncommittedEvent::from_typed(
                    (*user.id()).into(),
                    USER_AGGREGATE_TYPE,
                    Uuid::now_v7(),
                    event,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        if uncommitted.is_empty() {
            return Ok(());
        }

        let committed = self.store.append(uncommitted, expected)?;

        // Publish after append, in produced order. Failure here leaves the
        // durable write intact (see module docs).
        for stored in &committed {
            let envelope = stored.to_envelope();
            let topic = envelope.topic();
            self.bus
                .publish(&topic, envelope)
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        user.take_uncommitted_events();
        Ok(())
    }
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Ensure the stream belongs to the requested aggregate and sequence
    // numbers are strictly increasing, even if a buggy backend misbehaves.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!("loaded stream contains wrong aggregate_id at index {idx}"),
            )));
        }
        if e.sequence_number == 0 || e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!(
                    "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                    e.sequence_number
                ),
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}
