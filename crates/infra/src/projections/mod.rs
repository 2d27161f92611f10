//! Read-side projections over the event bus.

mod users;

pub use users::{ProjectionError, UsersProjection};
