//! `clavis-identity` — the User aggregate and credential policy.

pub mod password;
pub mod user;

pub use password::{PasswordHasher, validate_password, validate_username};
pub use user::{
    RegisterUser, USER_AGGREGATE_TYPE, USER_REGISTERED, User, UserCommand, UserEvent,
    UserRegistered, register_events,
};
