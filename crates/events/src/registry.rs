//! Event type registry: name → payload decoder.
//!
//! The registry is an explicit object constructed once at startup and passed
//! by reference to every component that crosses a serialization boundary
//! (event store load path, projector). It is never global state.
//!
//! It is deliberately a *lookup table*, not a runtime type resolver: events
//! are closed sum types per aggregate, so consumers keep compile-time
//! exhaustiveness; the registry only knows how to turn a stored
//! `(event_type, payload)` pair back into that sum type.

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The event type name is already bound to a decoder.
    #[error("duplicate registration for event type '{0}'")]
    DuplicateRegistration(String),

    /// The event type name is not bound to any decoder.
    ///
    /// On the load path this protects against registry/version skew: a
    /// stored record whose type this process cannot resolve is surfaced
    /// instead of silently dropped.
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    /// The decoder rejected the payload.
    #[error("payload decode failed for event type '{0}': {1}")]
    Decode(String, String),
}

type DecodeFn<E> = fn(&JsonValue) -> Result<E, serde_json::Error>;

/// Registry mapping event type names to payload decoders for one closed
/// event sum type `E`.
///
/// Populate completely before any store or consumer operation; afterwards
/// the registry is read-only and safe for concurrent reads (share via
/// `Arc`).
#[derive(Debug)]
pub struct EventRegistry<E> {
    decoders: HashMap<&'static str, DecodeFn<E>>,
}

impl<E> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Bind `type_name` to a decoder.
    pub fn register(
        &mut self,
        type_name: &'static str,
        decode: DecodeFn<E>,
    ) -> Result<(), RegistryError> {
        if self.decoders.contains_key(type_name) {
            return Err(RegistryError::DuplicateRegistration(type_name.to_string()));
        }
        self.decoders.insert(type_name, decode);
        Ok(())
    }

    /// Resolve the decoder bound to `type_name`.
    pub fn resolve(&self, type_name: &str) -> Result<DecodeFn<E>, RegistryError> {
        self.decoders
            .get(type_name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownEventType(type_name.to_string()))
    }

    /// Resolve and run the decoder for `type_name` against `payload`.
    pub fn decode(&self, type_name: &str, payload: &JsonValue) -> Result<E, RegistryError> {
        let decode = self.resolve(type_name)?;
        decode(payload).map_err(|e| RegistryError::Decode(type_name.to_string(), e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
