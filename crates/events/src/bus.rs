//! Event publishing/subscription abstraction (mechanics only).
//!
//! The event bus is the **transport layer** for events after they have been
//! persisted to the event store:
//!
//! ```text
//! Command → Event Store (append) → Event Bus (publish) → Consumers
//! ```
//!
//! Design constraints:
//! - **Transport-agnostic**: works with in-memory channels, brokers, etc.
//! - **At-least-once delivery**: events may be delivered multiple times;
//!   consumers must be idempotent.
//! - **No persistence**: the bus distributes, the event store is the source
//!   of truth. If publication fails the events are still durable and can be
//!   republished.
//!
//! Routing is topic-based: publishers route each message under a topic
//! derived from the event type (`auth.<EventType>`); subscribers register a
//! topic prefix and receive every message whose topic starts with it.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a topic-prefixed event stream.
///
/// Each subscription gets a copy of every message published under a
/// matching topic. Designed for single-threaded consumption: one
/// subscription, one consumer loop.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Domain-agnostic event bus (topic-routed pub/sub).
///
/// `publish` can fail (bus unreachable, channel closed). Failures are
/// surfaced to the caller; since events are persisted before publication,
/// retrying is safe and may only duplicate delivery.
///
/// Implementations must be `Send + Sync`; multiple threads can publish
/// concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Publish a message under a topic (e.g. `auth.UserRegistered`).
    fn publish(&self, topic: &str, message: M) -> Result<(), Self::Error>;

    /// Subscribe to all topics starting with `topic_prefix`.
    fn subscribe(&self, topic_prefix: &str) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, topic: &str, message: M) -> Result<(), Self::Error> {
        (**self).publish(topic, message)
    }

    fn subscribe(&self, topic_prefix: &str) -> Subscription<M> {
        (**self).subscribe(topic_prefix)
    }
}
