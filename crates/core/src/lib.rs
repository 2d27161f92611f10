//! `clavis-core` — domain kernel: aggregate traits, identifiers, errors.
//!
//! This crate has no infrastructure dependencies; everything here is pure
//! and deterministic.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, DeterministicIdGenerator, UserId};
