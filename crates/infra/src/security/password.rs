//! Argon2id implementation of the domain's hashing seam.

use argon2::password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher as _};

use clavis_core::{DomainError, DomainResult};
use clavis_identity::PasswordHasher;

/// Argon2id hasher with the crate's default parameters.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, raw: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| DomainError::validation(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, raw: &str, hash: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| DomainError::validation(format!("stored hash is malformed: {e}")))?;
        Ok(self
            .argon2
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok())
    }
}
