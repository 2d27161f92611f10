//! Credential validation policy and the hashing seam.
//!
//! Hashing primitives live behind [`PasswordHasher`] so the domain stays
//! deterministic; `clavis-infra` provides the argon2 implementation.

use clavis_core::{DomainError, DomainResult};

/// Minimum accepted raw password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum accepted username length.
pub const MAX_USERNAME_LEN: usize = 64;

/// Validate a username against registration policy.
///
/// Non-empty after trimming, bounded length, printable ASCII without
/// whitespace.
pub fn validate_username(username: &str) -> DomainResult<()> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("invalid username: empty"));
    }
    if trimmed.len() > MAX_USERNAME_LEN {
        return Err(DomainError::validation("invalid username: too long"));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(DomainError::validation(
            "invalid username: only alphanumerics, '-', '_' and '.' allowed",
        ));
    }
    Ok(())
}

/// Validate a raw password against registration policy.
///
/// Runs before hashing; the hash itself is opaque to the domain.
pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.trim().is_empty() {
        return Err(DomainError::validation("invalid password: empty"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "invalid password: must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Credential digest provider (excluded collaborator; interface only).
///
/// Implementations must be safe for concurrent use.
pub trait PasswordHasher: Send + Sync {
    /// Produce an opaque digest of `raw`.
    fn hash(&self, raw: &str) -> DomainResult<String>;

    /// Check `raw` against a previously produced digest.
    fn verify(&self, raw: &str, hash: &str) -> DomainResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_usernames_pass() {
        for name in ["alice", "bob-2", "a_b.c", "X9"] {
            assert!(validate_username(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_usernames_fail() {
        for name in ["", "   ", "has space", "emoji🔥", &"x".repeat(65)] {
            assert!(
                matches!(validate_username(name), Err(DomainError::Validation(_))),
                "{name:?} should be invalid"
            );
        }
    }

    #[test]
    fn short_or_blank_passwords_fail() {
        assert!(matches!(
            validate_password("short"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_password("        "),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn policy_accepts_reasonable_passwords() {
        assert!(validate_password("correct-horse").is_ok());
    }
}
