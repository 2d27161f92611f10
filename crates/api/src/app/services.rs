//! Service wiring: event store/bus, projection worker, auth service.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use clavis_core::{DeterministicIdGenerator, DomainError, UserId};
use clavis_events::{EventEnvelope, EventRegistry, InMemoryEventBus, RegistryError, TOPIC_PREFIX};
use clavis_identity::{PasswordHasher, User, UserEvent, register_events, validate_password};
use clavis_infra::command_handler::{DispatchError, UserCommandHandler};
use clavis_infra::event_store::InMemoryEventStore;
use clavis_infra::projections::UsersProjection;
use clavis_infra::read_model::{InMemoryUserReadStore, UserReadStore};
use clavis_infra::security::Argon2PasswordHasher;
use clavis_infra::workers::{ProjectionWorker, spawn_projection_worker};
use clavis_tokens::{
    InMemoryTokenRepository, JwtSigner, RefreshTokenGenerator, TokenError, TokenPair, TokenService,
};

use crate::config::Config;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Token validation/lifecycle failure. Surfaced without detail.
    #[error("token rejected")]
    Token(TokenError),

    /// Unknown user or wrong password. Deliberately indistinguishable.
    #[error("unauthorized")]
    Unauthorized,

    /// Infrastructure failure; logged, opaque to the client.
    #[error("internal error")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Signing(msg) | TokenError::Repository(msg) => AuthError::Internal(msg),
            other => AuthError::Token(other),
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        AuthError::Dispatch(DispatchError::from(value))
    }
}

/// Application-facing authentication service.
///
/// Write side goes through the command handler; reads go through the
/// projected read store, so a just-registered user becomes loginable only
/// once the projection catches up (eventual consistency by design).
pub struct AuthService {
    handler: UserCommandHandler<Arc<InMemoryEventStore>, Bus>,
    read_store: Arc<InMemoryUserReadStore>,
    hasher: Argon2PasswordHasher,
    tokens: TokenService<InMemoryTokenRepository>,
}

impl AuthService {
    /// Register a new user: raw-password policy, hash, then the command
    /// pipeline.
    pub fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        validate_password(password)?;
        let password_hash = self.hasher.hash(password)?;
        Ok(self.handler.handle_register_user(username, password_hash)?)
    }

    /// Authenticate by username + password and issue a token pair.
    ///
    /// Unknown usernames and wrong passwords both map to
    /// [`AuthError::Unauthorized`].
    pub fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let record = self
            .read_store
            .get_by_username(username.trim())
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::Unauthorized)?;

        let matches = self.hasher.verify(password, &record.password_hash)?;
        if !matches {
            return Err(AuthError::Unauthorized);
        }

        info!(user_id = %record.user_id, "login succeeded");
        Ok(self.tokens.issue(record.user_id)?)
    }

    /// Rotate a refresh token into a fresh pair.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        Ok(self.tokens.refresh(refresh_token)?)
    }

    /// Revoke a refresh token (logout). Idempotent.
    pub fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        Ok(self.tokens.revoke(refresh_token)?)
    }

    /// Verify an access token offline and return its subject.
    pub fn validate(&self, access_token: &str) -> Result<UserId, AuthError> {
        Ok(self.tokens.verify_access(access_token)?)
    }
}

/// Build the in-memory service graph and start the projection worker.
///
/// Fails when the event registry cannot be populated; the caller treats
/// that as fatal at boot.
pub fn build_services(config: &Config) -> Result<(AuthService, ProjectionWorker), RegistryError> {
    let mut registry = EventRegistry::new();
    register_events(&mut registry)?;
    let registry: Arc<EventRegistry<UserEvent>> = Arc::new(registry);

    let store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let read_store = Arc::new(InMemoryUserReadStore::new());

    let projection = UsersProjection::new(read_store.clone(), registry.clone());
    let worker = spawn_projection_worker("users", &*bus, TOPIC_PREFIX, projection);

    let handler = UserCommandHandler::new(
        store,
        bus,
        registry,
        DeterministicIdGenerator::new(&config.id_namespace),
    );

    let tokens = TokenService::new(
        JwtSigner::new(&config.jwt_issuer, config.jwt_secret.as_bytes(), config.access_ttl),
        RefreshTokenGenerator::new(config.refresh_prefix.clone(), 32),
        InMemoryTokenRepository::new(),
        config.refresh_ttl,
    );

    let service = AuthService {
        handler,
        read_store,
        hasher: Argon2PasswordHasher::new(),
        tokens,
    };

    Ok((service, worker))
}
