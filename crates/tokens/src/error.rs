use thiserror::Error;

/// Token lifecycle error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No stored refresh token matches the presented string.
    #[error("token not found")]
    NotFound,

    /// The token's expiry has elapsed.
    #[error("token expired")]
    Expired,

    /// The refresh token was revoked (logout or rotation).
    #[error("token revoked")]
    Revoked,

    /// Access token failed signature or shape verification.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Access token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// Token persistence failed (infrastructure).
    #[error("token repository error: {0}")]
    Repository(String),
}
