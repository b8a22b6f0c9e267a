//! Token Authentication
//!
//! HS256 bearer tokens carrying `{username, role}`. Every service shares the
//! signing secret, so a token issued by one service is accepted by the others.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tb_config::AuthSettings;

use crate::error::{PlatformError, Result};

/// Claims embedded in every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_ttl: Duration::hours(1),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

impl From<&AuthSettings> for AuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self::new(settings.jwt_secret.clone()).with_ttl(Duration::seconds(settings.token_ttl_secs))
    }
}

pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Sign a token for `username` with `role`, expiring after the configured TTL
    pub fn issue_token(&self, username: &str, role: &str) -> Result<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            username: username.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.token_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to sign token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<AccessTokenClaims> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| PlatformError::invalid_token(e.to_string()))
    }

    pub fn token_ttl(&self) -> Duration {
        self.config.token_ttl
    }
}

/// Token part of an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new("test-secret"))
    }

    #[test]
    fn test_issue_and_validate() {
        let auth = service();
        let token = auth.issue_token("alice", "Admin").unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "Admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = AuthService::new(AuthConfig::new("other")).issue_token("bob", "Admin").unwrap();
        let err = service().validate_token(&token).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidToken { .. }));
    }

    #[test]
    fn test_rejects_expired_token() {
        let auth = AuthService::new(AuthConfig::new("test-secret").with_ttl(Duration::seconds(-10)));
        let token = auth.issue_token("alice", "Admin").unwrap();
        assert!(auth.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("abc"), None);
    }
}
