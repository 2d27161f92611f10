//! Signed access tokens (stateless).
//!
//! Access tokens are short-lived, self-contained assertions of `user_id`
//! plus expiry. They are verified purely by signature and time window —
//! never persisted, never individually revocable.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use clavis_core::UserId;

use crate::error::TokenError;

/// Claims carried in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user this token asserts.
    pub sub: UserId,
    /// Issuer service identifier.
    pub iss: String,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

/// HS256 signer/verifier for access tokens.
///
/// Key material is injected at construction (key management is outside this
/// crate). Safe to share across threads.
pub struct JwtSigner {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
}

impl core::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtSigner {
    pub fn new(issuer: impl Into<String>, secret: &[u8], access_ttl: Duration) -> Self {
        Self {
            issuer: issuer.into(),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign an access token for `user_id`, expiring `access_ttl` from `now`.
    pub fn sign(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: user_id,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature + time window and return the asserted user id.
    ///
    /// Pure: no storage access, ever.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            }
        })?;

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> JwtSigner {
        JwtSigner::new("clavis", b"test-secret", Duration::minutes(15))
    }

    #[test]
    fn sign_then_verify_round_trips_user_id() {
        let signer = signer();
        let user_id = UserId::new();

        let token = signer.sign(user_id, Utc::now()).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = signer();
        // Issued far enough in the past that iat + 15min has elapsed.
        let issued = Utc::now() - Duration::hours(1);

        let token = signer.sign(UserId::new(), issued).unwrap();
        assert_eq!(signer.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn wrong_key_is_an_invalid_signature() {
        let signer = signer();
        let other = JwtSigner::new("clavis", b"other-secret", Duration::minutes(15));

        let token = signer.sign(UserId::new(), Utc::now()).unwrap();
        assert_eq!(other.verify(&token).unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let signer = signer();
        let other = JwtSigner::new("someone-else", b"test-secret", Duration::minutes(15));

        let token = other.sign(UserId::new(), Utc::now()).unwrap();
        assert_eq!(signer.verify(&token).unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn garbage_is_an_invalid_signature() {
        assert_eq!(
            signer().verify("not-a-jwt").unwrap_err(),
            TokenError::InvalidSignature
        );
    }
}
