//! `clavis-events` — event abstractions: trait, envelope, registry, bus.
//!
//! Everything here is transport- and storage-agnostic; concrete stores and
//! consumers live in `clavis-infra`.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod projection;
pub mod registry;

pub use bus::{EventBus, Subscription};
pub use command::Command;
pub use envelope::{EventEnvelope, TOPIC_PREFIX};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use projection::Projection;
pub use registry::{EventRegistry, RegistryError};
