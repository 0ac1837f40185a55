//! Signed bearer tokens.
//!
//! Three-part HS256 JWTs carrying an identity snapshot taken at issuance.
//! The signing secret is injected at construction and held for the life of
//! the manager; rotating it means constructing a new manager, callers are
//! untouched. Validation uses zero leeway so the expiry boundary is exact.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::TokenError;

/// Claims embedded in a bearer token. A snapshot, not a live view: the
/// session service re-reads the user record on every validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
    issuer: String,
}

impl TokenManager {
    pub fn new(secret: &str, lifetime: Duration, issuer: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
            issuer: issuer.to_string(),
        }
    }

    /// Issue a signed token for the given identity. Returns the token and its
    /// expiry so callers need not decode it again.
    pub fn generate_token(
        &self,
        user_id: i64,
        username: &str,
        email: &str,
        is_admin: bool,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let now = Utc::now();
        let expires_at = now + self.lifetime;
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            username: username.to_string(),
            email: email.to_string(),
            is_admin,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;
        Ok((token, expires_at))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::InvalidIssuer
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new("test-secret", Duration::hours(1), "gatekeeper")
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let tm = manager();
        let (token, expires_at) = tm.generate_token(7, "alice", "a@x.com", true).unwrap();

        let claims = tm.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "a@x.com");
        assert!(claims.is_admin);
        assert_eq!(claims.iss, "gatekeeper");
        assert_eq!(claims.expires_at().timestamp(), expires_at.timestamp());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tm = TokenManager::new("test-secret", Duration::seconds(-2), "gatekeeper");
        let (token, _) = tm.generate_token(1, "alice", "a@x.com", false).unwrap();

        assert!(matches!(
            tm.validate_token(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn token_validates_until_its_expiry() {
        // Issued with a 1-second lifetime: valid immediately, expired once
        // the boundary passes.
        let tm = TokenManager::new("test-secret", Duration::seconds(1), "gatekeeper");
        let (token, _) = tm.generate_token(1, "alice", "a@x.com", false).unwrap();
        assert!(tm.validate_token(&token).is_ok());

        std::thread::sleep(std::time::Duration::from_millis(2100));
        assert!(matches!(
            tm.validate_token(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn wrong_secret_is_a_bad_signature() {
        let tm = manager();
        let other = TokenManager::new("other-secret", Duration::hours(1), "gatekeeper");
        let (token, _) = other.generate_token(1, "alice", "a@x.com", false).unwrap();

        assert!(matches!(
            tm.validate_token(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let tm = manager();
        let other = TokenManager::new("test-secret", Duration::hours(1), "someone-else");
        let (token, _) = other.generate_token(1, "alice", "a@x.com", false).unwrap();

        assert!(matches!(
            tm.validate_token(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let tm = manager();
        assert!(matches!(
            tm.validate_token("not-a-jwt"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            tm.validate_token(""),
            Err(TokenError::Malformed)
        ));
    }
}
