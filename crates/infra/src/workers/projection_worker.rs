//! Dedicated thread that drains a bus subscription into a projection.
//!
//! The worker polls its subscription with a short timeout so it can notice
//! the shutdown signal between messages. Handler errors are logged and the
//! message is dropped; with an in-process mpsc bus there is no redelivery,
//! so a failed apply shows up as projection lag until the stream is
//! replayed.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use clavis_events::{EventBus, EventEnvelope, Projection};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Handle to a running projection worker. Dropping it without calling
/// [`ProjectionWorker::shutdown`] detaches the thread.
pub struct ProjectionWorker {
    name: &'static str,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl ProjectionWorker {
    /// Signal the worker and wait for it to drain and exit.
    pub fn shutdown(mut self) {
        // Send fails only if the thread already exited.
        let _ = self.shutdown.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(worker = self.name, "projection worker panicked");
            }
        }
    }
}

/// Subscribe `projection` to every envelope under `topic_prefix` and start
/// applying them on a dedicated thread.
pub fn spawn_projection_worker<B, P>(
    name: &'static str,
    bus: &B,
    topic_prefix: &str,
    projection: P,
) -> ProjectionWorker
where
    B: EventBus<EventEnvelope<JsonValue>>,
    P: Projection + 'static,
{
    let subscription = bus.subscribe(topic_prefix);
    let (shutdown_tx, shutdown_rx) = mpsc::channel();

    let thread = std::thread::Builder::new()
        .name(format!("projection-{name}"))
        .spawn(move || {
            info!(worker = name, "projection worker started");
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }
                match subscription.recv_timeout(POLL_INTERVAL) {
                    Ok(envelope) => {
                        if let Err(e) = projection.apply(&envelope) {
                            warn!(
                                worker = name,
                                event_type = envelope.event_type(),
                                aggregate_id = %envelope.aggregate_id(),
                                sequence_number = envelope.sequence_number(),
                                error = ?e,
                                "projection failed to apply event"
                            );
                        } else {
                            debug!(
                                worker = name,
                                event_type = envelope.event_type(),
                                sequence_number = envelope.sequence_number(),
                                "applied event"
                            );
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        info!(worker = name, "bus disconnected, stopping");
                        break;
                    }
                }
            }
            info!(worker = name, "projection worker stopped");
        })
        .expect("failed to spawn projection worker thread");

    ProjectionWorker {
        name,
        shutdown: shutdown_tx,
        thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    use chrono::Utc;
    use uuid::Uuid;

    use clavis_core::UserId;
    use clavis_events::{EventRegistry, InMemoryEventBus};
    use clavis_identity::{
        USER_AGGREGATE_TYPE, USER_REGISTERED, UserEvent, UserRegistered, register_events,
    };

    use crate::projections::UsersProjection;
    use crate::read_model::{InMemoryUserReadStore, UserReadStore};

    fn registered_envelope(user_id: UserId) -> EventEnvelope<JsonValue> {
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
            1,
            USER_REGISTERED,
            Utc::now(),
            serde_json::to_value(&event).unwrap(),
        )
    }

    #[test]
    fn worker_applies_published_events() {
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> =
            Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryUserReadStore::new());

        let mut registry = EventRegistry::new();
        register_events(&mut registry).unwrap();
        let projection = UsersProjection::new(store.clone(), Arc::new(registry));

        let worker = spawn_projection_worker("users", &*bus, "auth.", projection);

        let user_id = UserId::new();
        let envelope = registered_envelope(user_id);
        bus.publish(&envelope.topic(), envelope).unwrap();

        // Wait for the worker thread to pick it up.
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if store.get(user_id).unwrap().is_some() {
                break;
            }
            assert!(Instant::now() < deadline, "projection never applied");
            std::thread::sleep(Duration::from_millis(10));
        }

        worker.shutdown();
        assert_eq!(store.get(user_id).unwrap().unwrap().username, "alice");
    }

    #[test]
    fn shutdown_stops_the_worker() {
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> =
            Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryUserReadStore::new());

        let mut registry = EventRegistry::new();
        register_events(&mut registry).unwrap();
        let projection = UsersProjection::new(store, Arc::new(registry));

        let worker = spawn_projection_worker("users", &*bus, "auth.", projection);
        worker.shutdown();
    }
}
