use serde_json::Value as JsonValue;

use crate::EventEnvelope;

/// A projection builds a read model from an append-only event stream.
///
/// Projections implement the CQRS read side: they fold events (write model)
/// into queryable state (read model). Read models are **disposable** — they
/// can be rebuilt from the event log at any time; events are the source of
/// truth.
///
/// ## Idempotency
///
/// The bus delivers at-least-once, so `apply` must be idempotent: applying
/// an already-applied event leaves the read model unchanged. The standard
/// strategy here is a per-aggregate version guard (`applied_version` on the
/// read model record).
///
/// ## Error handling
///
/// Returning an error signals that the message could not be applied *yet*
/// (e.g. an out-of-order gap) and should be redelivered later. Permanently
/// irrelevant events are a successful no-op, not an error.
pub trait Projection: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Apply a single envelope to the projection, updating the read model.
    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error>;
}
