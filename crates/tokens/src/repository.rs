//! Refresh token persistence seam.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::TokenError;
use crate::refresh::RefreshToken;

/// Persistence for refresh tokens and their revocation state.
///
/// `rotate` must be atomic at the storage layer: the successor is stored
/// and the predecessor revoked as one operation, in that order, so a crash
/// can briefly leave two valid tokens but never zero.
pub trait TokenRepository: Send + Sync {
    fn store(&self, token: &RefreshToken) -> Result<(), TokenError>;

    /// Look up a token by its opaque string.
    fn get(&self, token: &str) -> Result<RefreshToken, TokenError>;

    /// Mark a token revoked. Idempotent: revoking an already-revoked or
    /// unknown token is not an error.
    fn revoke(&self, token: &str) -> Result<(), TokenError>;

    /// Store `new` and revoke `old_token` atomically.
    fn rotate(&self, old_token: &str, new: &RefreshToken) -> Result<(), TokenError>;
}

/// In-memory token repository for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTokenRepository {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenRepository for InMemoryTokenRepository {
    fn store(&self, token: &RefreshToken) -> Result<(), TokenError> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| TokenError::Repository("lock poisoned".to_string()))?;
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    fn get(&self, token: &str) -> Result<RefreshToken, TokenError> {
        let tokens = self
            .tokens
            .read()
            .map_err(|_| TokenError::Repository("lock poisoned".to_string()))?;
        tokens.get(token).cloned().ok_or(TokenError::NotFound)
    }

    fn revoke(&self, token: &str) -> Result<(), TokenError> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| TokenError::Repository("lock poisoned".to_string()))?;
        if let Some(stored) = tokens.get_mut(token) {
            stored.revoked = true;
        }
        Ok(())
    }

    fn rotate(&self, old_token: &str, new: &RefreshToken) -> Result<(), TokenError> {
        // Single write lock covers both steps: store-new-then-revoke-old.
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| TokenError::Repository("lock poisoned".to_string()))?;
        tokens.insert(new.token.clone(), new.clone());
        if let Some(stored) = tokens.get_mut(old_token) {
            stored.revoked = true;
        }
        Ok(())
    }
}
