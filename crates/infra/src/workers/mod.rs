//! Background workers consuming the event bus.

mod projection_worker;

pub use projection_worker::{ProjectionWorker, spawn_projection_worker};
