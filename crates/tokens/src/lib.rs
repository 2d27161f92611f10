//! `clavis-tokens` — session credential lifecycle.
//!
//! Two token kinds with deliberately different trust models:
//! - **access tokens**: short-lived, signed, stateless — verified offline;
//! - **refresh tokens**: longer-lived, opaque, stateful — persisted,
//!   revocable and rotated on use.

pub mod claims;
pub mod error;
pub mod refresh;
pub mod repository;
pub mod service;

pub use claims::{AccessClaims, JwtSigner};
pub use error::TokenError;
pub use refresh::{RefreshToken, RefreshTokenGenerator};
pub use repository::{InMemoryTokenRepository, TokenRepository};
pub use service::{TokenPair, TokenService};
