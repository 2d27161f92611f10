//! Opaque refresh tokens (stateful).

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use clavis_core::UserId;

/// A stored refresh token.
///
/// The `token` string is opaque and unguessable; everything the server
/// knows about it lives here. Exactly one non-revoked token should exist
/// per session lineage — rotation revokes the predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Generator for namespaced, high-entropy opaque token strings.
///
/// The prefix distinguishes refresh tokens from other token kinds at a
/// glance (`cv_<hex>`); the body is `byte_len` random bytes, hex-encoded.
#[derive(Debug, Clone)]
pub struct RefreshTokenGenerator {
    prefix: String,
    byte_len: usize,
}

impl RefreshTokenGenerator {
    pub fn new(prefix: impl Into<String>, byte_len: usize) -> Self {
        Self {
            prefix: prefix.into(),
            byte_len,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Produce a fresh opaque token string.
    pub fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.byte_len];
        rand::thread_rng().fill_bytes(&mut bytes);

        let mut out = String::with_capacity(self.prefix.len() + self.byte_len * 2);
        out.push_str(&self.prefix);
        for b in bytes {
            use core::fmt::Write;
            let _ = write!(out, "{b:02x}");
        }
        out
    }

    /// Build a full refresh token record for `user_id`.
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> RefreshToken {
        RefreshToken {
            token: self.generate(),
            user_id,
            issued_at: now,
            expires_at: now + ttl,
            revoked: false,
        }
    }
}

impl Default for RefreshTokenGenerator {
    /// Default scheme: `cv_` prefix, 32 bytes of entropy.
    fn default() -> Self {
        Self::new("cv_", 32)
    }
}
