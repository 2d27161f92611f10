//! User aggregate for identity management (event-sourced).
//!
//! The aggregate is pure: `handle` decides, `apply` evolves. Credential
//! hashing is an injected collaborator (see [`crate::password`]); commands
//! carry the already-computed hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clavis_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use clavis_events::{Command, Event, EventRegistry, RegistryError};

use crate::password::validate_username;

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// User aggregate.
///
/// # Invariants
/// - `username` is non-empty and immutable after registration.
/// - `version` equals the number of events applied.
/// - Users are never physically deleted; any future deactivation is itself
///   an event.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub version: u64,
    pub registered: bool,

    /// Events produced by `execute` and not yet committed to the store.
    uncommitted_events: Vec<UserEvent>,
}

impl User {
    /// Blank aggregate, ready for rehydration or a first command.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            username: String::new(),
            password_hash: String::new(),
            version: 0,
            registered: false,
            uncommitted_events: Vec::new(),
        }
    }

    /// Rebuild a user from its full, ordered event history.
    ///
    /// Fails with `NotFound` when the stream is empty (mutating a
    /// nonexistent aggregate) — the resulting `version` always equals the
    /// number of events folded in.
    pub fn reconstruct(id: UserId, events: &[UserEvent]) -> Result<Self, DomainError> {
        if events.is_empty() {
            return Err(DomainError::NotFound);
        }

        let mut user = Self::empty(id);
        for event in events {
            user.apply(event);
        }
        Ok(user)
    }

    /// Handle a command and fold the produced events into this aggregate,
    /// buffering them as uncommitted.
    ///
    /// The caller (command handler) persists and publishes the buffer, then
    /// clears it via [`User::take_uncommitted_events`].
    pub fn execute(&mut self, command: &UserCommand) -> Result<(), DomainError> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        self.uncommitted_events.extend(events);
        Ok(())
    }

    pub fn uncommitted_events(&self) -> &[UserEvent] {
        &self.uncommitted_events
    }

    /// Drain the uncommitted buffer (after a successful commit).
    pub fn take_uncommitted_events(&mut self) -> Vec<UserEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command to register a new user.
///
/// `password_hash` is the output of the injected [`crate::password::PasswordHasher`];
/// raw-password policy checks happen before hashing, at the service edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// All user commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserCommand {
    Register(RegisterUser),
}

impl Command for UserCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            UserCommand::Register(cmd) => cmd.user_id.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Event emitted when a user registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// All user events (closed sum type; the projector's match stays
/// exhaustive at compile time).
///
/// Untagged on the wire: the persisted payload is the variant struct
/// itself, and the stored `event_type` is the discriminant the registry
/// resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserEvent {
    Registered(UserRegistered),
}

pub const USER_REGISTERED: &str = "UserRegistered";

/// Stream type identifier for user aggregates.
pub const USER_AGGREGATE_TYPE: &str = "auth.user";

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => USER_REGISTERED,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
        }
    }
}

fn decode_user_registered(value: &serde_json::Value) -> Result<UserEvent, serde_json::Error> {
    Ok(UserEvent::Registered(UserRegistered::deserialize(value)?))
}

/// Bind every user event decoder into `registry`.
///
/// Call once at startup, before any store or consumer operation.
pub fn register_events(registry: &mut EventRegistry<UserEvent>) -> Result<(), RegistryError> {
    registry.register(USER_REGISTERED, decode_user_registered)
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Registered(e) => self.apply_registered(e),
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Register(cmd) => self.handle_register(cmd),
        }
    }
}

impl User {
    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.registered {
            return Err(DomainError::invariant("user already registered"));
        }

        validate_username(&cmd.username)?;

        if cmd.password_hash.is_empty() {
            return Err(DomainError::validation("invalid password"));
        }

        Ok(vec![UserEvent::Registered(UserRegistered {
            user_id: cmd.user_id,
            username: cmd.username.trim().to_string(),
            password_hash: cmd.password_hash.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn apply_registered(&mut self, e: &UserRegistered) {
        self.id = e.user_id;
        self.username = e.username.clone();
        self.password_hash = e.password_hash.clone();
        self.registered = true;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn register_cmd(user_id: UserId, username: &str) -> UserCommand {
        UserCommand::Register(RegisterUser {
            user_id,
            username: username.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            occurred_at: now(),
        })
    }

    #[test]
    fn register_produces_single_event_and_version_one() {
        let user_id = UserId::new();
        let mut user = User::empty(user_id);

        user.execute(&register_cmd(user_id, "alice")).unwrap();

        assert_eq!(user.version, 1);
        assert!(user.registered);
        assert_eq!(user.username, "alice");
        assert_eq!(user.uncommitted_events().len(), 1);

        let UserEvent::Registered(e) = &user.uncommitted_events()[0];
        assert_eq!(e.username, "alice");
        assert_eq!(e.user_id, user_id);
    }

    #[test]
    fn register_twice_is_an_invariant_violation() {
        let user_id = UserId::new();
        let mut user = User::empty(user_id);
        user.execute(&register_cmd(user_id, "alice")).unwrap();

        let err = user.execute(&register_cmd(user_id, "alice")).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        // The failed command must not grow the buffer.
        assert_eq!(user.uncommitted_events().len(), 1);
    }

    #[test]
    fn empty_username_is_rejected() {
        let user_id = UserId::new();
        let user = User::empty(user_id);

        let result = user.handle(&register_cmd(user_id, "   "));
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn empty_password_hash_is_rejected() {
        let user_id = UserId::new();
        let user = User::empty(user_id);

        let cmd = UserCommand::Register(RegisterUser {
            user_id,
            username: "alice".to_string(),
            password_hash: String::new(),
            occurred_at: now(),
        });

        let result = user.handle(&cmd);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn reconstruct_from_history_matches_event_count() {
        let user_id = UserId::new();
        let events = vec![UserEvent::Registered(UserRegistered {
            user_id,
            username: "alice".to_string(),
            password_hash: "h".to_string(),
            occurred_at: now(),
        })];

        let user = User::reconstruct(user_id, &events).unwrap();
        assert_eq!(user.version, events.len() as u64);
        assert_eq!(user.username, "alice");
        assert!(user.uncommitted_events().is_empty());
    }

    #[test]
    fn reconstruct_from_empty_stream_is_not_found() {
        let err = User::reconstruct(UserId::new(), &[]).unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn take_uncommitted_clears_the_buffer() {
        let user_id = UserId::new();
        let mut user = User::empty(user_id);
        user.execute(&register_cmd(user_id, "alice")).unwrap();

        let drained = user.take_uncommitted_events();
        assert_eq!(drained.len(), 1);
        assert!(user.uncommitted_events().is_empty());
        // State survives the drain.
        assert_eq!(user.version, 1);
    }

    #[test]
    fn event_payload_round_trips_through_registry() {
        let mut registry = EventRegistry::new();
        register_events(&mut registry).unwrap();

        let event = UserEvent::Registered(UserRegistered {
            user_id: UserId::new(),
            username: "alice".to_string(),
            password_hash: "h".to_string(),
            occurred_at: now(),
        });

        let payload = serde_json::to_value(&event).unwrap();
        let decoded = registry.decode(USER_REGISTERED, &payload).unwrap();
        assert_eq!(decoded, event);
    }
}
