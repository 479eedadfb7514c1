use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 token codec. Holds the short access-token TTL; callers needing a
/// different lifetime pass one to [`JwtCodec::issue`]. One process-wide
/// secret; rotation is out of scope.
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl JwtCodec {
    pub fn new(secret: &str, access_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
        }
    }

    pub fn issue(&self, sub: Uuid, email: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub,
            email: email.to_owned(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AuthError::Internal("token encoding failed"))
    }

    pub fn issue_access(&self, sub: Uuid, email: &str) -> Result<String, AuthError> {
        self.issue(sub, email, self.access_ttl)
    }

    /// Expired and malformed tokens are distinct failures: callers prompt a
    /// re-login for the former and treat the latter as tampering.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtCodec {
        JwtCodec::new("unit-test-secret", Duration::minutes(15))
    }

    #[test]
    fn roundtrip_preserves_subject_and_email() {
        let codec = codec();
        let sub = Uuid::new_v4();
        let token = codec.issue_access(sub, "a@example.com").unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.email, "a@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_distinguished_from_garbage() {
        let codec = codec();
        let token = codec
            .issue(Uuid::new_v4(), "a@example.com", Duration::minutes(-5))
            .unwrap();
        assert!(matches!(codec.verify(&token), Err(AuthError::TokenExpired)));
        assert!(matches!(
            codec.verify("not.a.token"),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn wrong_secret_fails_as_invalid() {
        let token = codec().issue_access(Uuid::new_v4(), "a@example.com").unwrap();
        let other = JwtCodec::new("different-secret", Duration::minutes(15));
        assert!(matches!(other.verify(&token), Err(AuthError::TokenInvalid)));
    }
}
