//! Bearer token issue/verify (HS256).
//!
//! The subject is the operator's email and is the sole identity claim the
//! rest of the system consumes. Verification checks signature and expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token lifetime: 24 hours from issue.
pub const TOKEN_TTL: Duration = Duration::hours(24);

/// JWT claims model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: operator email.
    pub sub: String,

    /// Issued-at, seconds since epoch.
    pub iat: i64,

    /// Expiration, seconds since epoch.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// HS256 token signer/verifier over a shared secret.
pub struct Hs256Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256Tokens {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for `email`, valid for [`TOKEN_TTL`] from `now`.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + TOKEN_TTL).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry; returns the subject email.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            },
        )?;

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_yields_subject() {
        let tokens = Hs256Tokens::new(b"test-secret");
        let token = tokens.issue("alice@example.com", Utc::now()).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "alice@example.com");
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = Hs256Tokens::new(b"test-secret");
        let issued = Utc::now() - TOKEN_TTL - Duration::minutes(5);
        let token = tokens.issue("alice@example.com", issued).unwrap();
        assert_eq!(tokens.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let tokens = Hs256Tokens::new(b"test-secret");
        let token = tokens.issue("alice@example.com", Utc::now()).unwrap();

        let other = Hs256Tokens::new(b"another-secret");
        assert!(matches!(
            other.verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = Hs256Tokens::new(b"test-secret");
        assert!(matches!(
            tokens.verify("not.a.token"),
            Err(TokenError::Invalid(_))
        ));
    }
}
