//! Infrastructure layer: event store, command handling, projections, read
//! models, token storage, credential hashing.

pub mod command_handler;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod security;
pub mod tokens;
pub mod workers;
