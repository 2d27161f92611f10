use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use clavis_core::{AggregateId, ExpectedVersion};
use clavis_events::{EventRegistry, RegistryError};

/// An event ready to be appended to a stream (not yet assigned a sequence
/// number).
///
/// Lifecycle: typed domain event → `UncommittedEvent` (serialized, with
/// stream metadata) → `StoredEvent` (sequence number assigned on append) →
/// `EventEnvelope` (published to the bus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream.
///
/// Sequence numbers are assigned by the store during append: monotonically
/// increasing per aggregate stream, gapless, starting at 1, immutable once
/// written. The `(aggregate_id, sequence_number)` pair is unique — that
/// uniqueness is the optimistic-concurrency mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into an envelope for publication.
    pub fn to_envelope(&self) -> clavis_events::EventEnvelope<JsonValue> {
        clavis_events::EventEnvelope::new(
            self.event_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.event_type.clone(),
            self.occurred_at,
            self.payload.clone(),
        )
    }
}

/// Event store operation error (infrastructure, not domain).
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Optimistic concurrency check failed: the stream moved past the
    /// expected version. Callers reload and retry; the store never retries.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// No events exist for the requested aggregate.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(AggregateId),

    /// A stored event's type is not resolvable through the registry
    /// (registry/version skew).
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// Invalid event data or stream state.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// Storage backend failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<RegistryError> for EventStoreError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::UnknownEventType(name) => EventStoreError::UnknownEventType(name),
            other => EventStoreError::InvalidAppend(other.to_string()),
        }
    }
}

/// Append-only event store.
///
/// Streams are keyed by aggregate id; within a stream, sequence numbers are
/// gapless and start at 1.
///
/// Implementations must:
/// - check optimistic concurrency against the current stream version
/// - assign sequence numbers monotonically (no gaps, no duplicates)
/// - persist each batch atomically (all events or none)
/// - detect concurrent appends via an atomic conditional-insert primitive
///   (unique `(aggregate_id, sequence_number)` or equivalent)
pub trait EventStore: Send + Sync {
    /// Append events to an aggregate stream.
    ///
    /// Events are persisted starting at `expected_version + 1`; fails with
    /// [`EventStoreError::Concurrency`] when the current stream version
    /// does not match.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream for an aggregate, ascending by sequence number.
    ///
    /// Fails with [`EventStoreError::AggregateNotFound`] when no events
    /// exist for `aggregate_id`.
    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(aggregate_id)
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    ///
    /// Serializes the payload and captures the event metadata needed for
    /// registry-driven deserialization on the read path.
    pub fn from_typed<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: clavis_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// Decode a loaded stream into typed events through the registry.
///
/// Fails with [`EventStoreError::UnknownEventType`] when a stored type is
/// unresolvable — skew between the stored log and this process's registry
/// must surface, not silently drop events.
pub fn decode_stream<E>(
    registry: &EventRegistry<E>,
    stream: &[StoredEvent],
) -> Result<Vec<E>, EventStoreError> {
    stream
        .iter()
        .map(|stored| {
            registry
                .decode(&stored.event_type, &stored.payload)
                .map_err(EventStoreError::from)
        })
        .collect()
}
