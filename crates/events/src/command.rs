use clavis_core::AggregateId;

/// A command targets a specific aggregate.
///
/// Commands represent **intent** — a request to perform an action on an
/// aggregate. They are transient (never persisted) and are transformed into
/// events, which are. Commands are rejected when invalid; events represent
/// accepted changes.
///
/// Commands must be `Clone + Send + Sync + 'static` so they can cross
/// thread boundaries and be retried/logged safely.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
