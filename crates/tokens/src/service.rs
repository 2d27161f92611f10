//! Token lifecycle orchestration: issue, refresh (rotate), verify, revoke.

use chrono::{Duration, Utc};
use tracing::debug;

use clavis_core::UserId;

use crate::claims::JwtSigner;
use crate::error::TokenError;
use crate::refresh::{RefreshToken, RefreshTokenGenerator};
use crate::repository::TokenRepository;

/// An issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: RefreshToken,
}

/// Issues and rotates session credentials.
///
/// Access tokens are stateless (signature-verified); refresh tokens are
/// persisted through the injected [`TokenRepository`]. Issuance and
/// rotation for different users never serialize against each other; a
/// single rotation is atomic at the repository layer.
pub struct TokenService<R> {
    signer: JwtSigner,
    generator: RefreshTokenGenerator,
    repository: R,
    refresh_ttl: Duration,
}

impl<R> core::fmt::Debug for TokenService<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("signer", &self.signer)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl<R> TokenService<R>
where
    R: TokenRepository,
{
    pub fn new(
        signer: JwtSigner,
        generator: RefreshTokenGenerator,
        repository: R,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            signer,
            generator,
            repository,
            refresh_ttl,
        }
    }

    /// Issue a fresh access/refresh pair for `user_id`, persisting the
    /// refresh token.
    pub fn issue(&self, user_id: UserId) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        let access_token = self.signer.sign(user_id, now)?;
        let refresh_token = self.generator.issue(user_id, now, self.refresh_ttl);

        self.repository.store(&refresh_token)?;

        debug!(user_id = %user_id, "issued token pair");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Rotate: validate the presented refresh token, issue a successor
    /// pair, and revoke the predecessor.
    ///
    /// The successor is stored before the predecessor is revoked (one
    /// atomic repository operation), so a crash mid-rotation can leave a
    /// brief window with two valid tokens but never strand the user with
    /// none.
    pub fn refresh(&self, old_token: &str) -> Result<TokenPair, TokenError> {
        let stored = self.repository.get(old_token)?;

        if stored.revoked {
            return Err(TokenError::Revoked);
        }
        let now = Utc::now();
        if stored.is_expired(now) {
            return Err(TokenError::Expired);
        }

        let access_token = self.signer.sign(stored.user_id, now)?;
        let successor = self.generator.issue(stored.user_id, now, self.refresh_ttl);

        self.repository.rotate(old_token, &successor)?;

        debug!(user_id = %stored.user_id, "rotated refresh token");
        Ok(TokenPair {
            access_token,
            refresh_token: successor,
        })
    }

    /// Verify an access token offline: signature + expiry only.
    pub fn verify_access(&self, token: &str) -> Result<UserId, TokenError> {
        self.signer.verify(token)
    }

    /// Explicit logout. Idempotent.
    pub fn revoke(&self, refresh_token: &str) -> Result<(), TokenError> {
        self.repository.revoke(refresh_token)
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTokenRepository;

    fn service() -> TokenService<InMemoryTokenRepository> {
        TokenService::new(
            JwtSigner::new("clavis", b"test-secret", Duration::minutes(15)),
            RefreshTokenGenerator::default(),
            InMemoryTokenRepository::new(),
            Duration::days(7),
        )
    }

    #[test]
    fn issue_then_verify_access_round_trips() {
        let service = service();
        let user_id = UserId::new();

        let pair = service.issue(user_id).unwrap();
        assert_eq!(service.verify_access(&pair.access_token).unwrap(), user_id);
        assert!(pair.refresh_token.token.starts_with("cv_"));
    }

    #[test]
    fn refresh_rotates_and_invalidates_predecessor() {
        let service = service();
        let user_id = UserId::new();
        let pair = service.issue(user_id).unwrap();

        let rotated = service.refresh(&pair.refresh_token.token).unwrap();
        assert_eq!(rotated.refresh_token.user_id, user_id);
        assert_ne!(rotated.refresh_token.token, pair.refresh_token.token);

        // The predecessor now fails validation.
        assert_eq!(
            service.refresh(&pair.refresh_token.token).unwrap_err(),
            TokenError::Revoked
        );
    }

    #[test]
    fn refresh_of_unknown_token_is_not_found() {
        let service = service();
        assert_eq!(
            service.refresh("cv_nonexistent").unwrap_err(),
            TokenError::NotFound
        );
    }

    #[test]
    fn refresh_of_revoked_token_is_revoked() {
        let service = service();
        let pair = service.issue(UserId::new()).unwrap();

        service.revoke(&pair.refresh_token.token).unwrap();
        assert_eq!(
            service.refresh(&pair.refresh_token.token).unwrap_err(),
            TokenError::Revoked
        );
    }

    #[test]
    fn refresh_of_expired_token_is_expired() {
        // Zero-lifetime refresh tokens expire immediately.
        let service = TokenService::new(
            JwtSigner::new("clavis", b"test-secret", Duration::minutes(15)),
            RefreshTokenGenerator::default(),
            InMemoryTokenRepository::new(),
            Duration::zero(),
        );

        let pair = service.issue(UserId::new()).unwrap();
        assert_eq!(
            service.refresh(&pair.refresh_token.token).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn revoke_is_idempotent_logout() {
        let service = service();
        let pair = service.issue(UserId::new()).unwrap();

        service.revoke(&pair.refresh_token.token).unwrap();
        service.revoke(&pair.refresh_token.token).unwrap();
    }
}
