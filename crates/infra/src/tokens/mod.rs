//! Durable refresh token storage.

mod postgres;

pub use postgres::PostgresTokenRepository;
