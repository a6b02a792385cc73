//! Signed session tokens
//!
//! Two lifetimes: a short-lived access token and a longer-lived refresh
//! token, both HS256-signed over the same claims. Verification failure
//! distinguishes "expired" from "invalid" so clients can decide between
//! re-login and refresh.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::user::User;

const ACCESS_TTL_DAYS: i64 = 7;
const REFRESH_TTL_DAYS: i64 = 30;

/// Claims carried in every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Access + refresh token pair issued at registration and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// HS256 token issuer/verifier
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue an access/refresh pair for a user
    pub fn issue(&self, user: &User) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(user, Duration::days(ACCESS_TTL_DAYS))?,
            refresh_token: self.sign(user, Duration::days(REFRESH_TTL_DAYS))?,
        })
    }

    fn sign(&self, user: &User, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Other(anyhow::anyhow!("token signing failed: {e}")))
    }

    /// Verify a token, mapping expiry to [`Error::TokenExpired`] and every
    /// other failure to [`Error::Unauthenticated`].
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::Unauthenticated("Invalid token.".to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "user-1".to_string(),
            name: "Ada".to_string(),
            email: "a@x.com".to_string(),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn issued_tokens_verify_with_matching_claims() {
        let service = TokenService::new("test-secret");
        let pair = service.issue(&test_user()).unwrap();

        for token in [&pair.access_token, &pair.refresh_token] {
            let claims = service.verify(token).unwrap();
            assert_eq!(claims.sub, "user-1");
            assert_eq!(claims.email, "a@x.com");
            assert_eq!(claims.name, "Ada");
        }
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        let service = TokenService::new("test-secret");
        let pair = service.issue(&test_user()).unwrap();

        let access = service.verify(&pair.access_token).unwrap();
        let refresh = service.verify(&pair.refresh_token).unwrap();
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let pair = TokenService::new("secret-a").issue(&test_user()).unwrap();

        let err = TokenService::new("secret-b")
            .verify(&pair.access_token)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let service = TokenService::new("test-secret");
        // Sign with a negative TTL to produce an already-expired token.
        let token = service.sign(&test_user(), Duration::days(-1)).unwrap();

        let err = service.verify(&token).unwrap_err();
        assert!(matches!(err, Error::TokenExpired));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let service = TokenService::new("test-secret");
        let err = service.verify("not.a.token").unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }
}
