//! JWT authentication module.
//!
//! Handles token generation and validation, plus the extractors handlers
//! use to require a signed-in user.
//!
//! ## Token Flow
//! ```text
//! POST /api/auth/login/ ──► access (60 min) + refresh (7 days, jti stored)
//!
//! GET /api/... ── Authorization: Bearer <access> ──► AuthUser / StaffUser
//!
//! POST /api/auth/refresh/ {refresh}
//!      │
//!      ├── signature / expiry / token_type checked here
//!      ├── jti consumed in refresh_tokens (second use fails)
//!      ▼
//! new access + new refresh
//! ```

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;
use sicarga_core::User;

pub use sicarga_db::{hash_password, verify_password};

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// Token problems. All but `Signing` are the caller's fault.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Expected {expected} token")]
    WrongTokenType { expected: &'static str },

    #[error("Token has been revoked")]
    Revoked,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is disabled")]
    Inactive,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access" or "refresh")
    pub token_type: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::InvalidToken("malformed subject".to_string()))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    /// Claims of `refresh`, for storing its jti.
    pub refresh_claims: Claims,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, access_lifetime: Duration, refresh_lifetime: Duration) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_lifetime,
            refresh_lifetime,
        }
    }

    fn sign(&self, user_id: i64, token_type: &str, lifetime: Duration) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok((token, claims))
    }

    /// Generate an access token.
    pub fn generate_access_token(&self, user_id: i64) -> Result<String, AuthError> {
        self.sign(user_id, ACCESS, self.access_lifetime)
            .map(|(token, _)| token)
    }

    /// Generate a refresh token together with its claims.
    pub fn generate_refresh_token(&self, user_id: i64) -> Result<(String, Claims), AuthError> {
        self.sign(user_id, REFRESH, self.refresh_lifetime)
    }

    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair, AuthError> {
        let access = self.generate_access_token(user_id)?;
        let (refresh, refresh_claims) = self.generate_refresh_token(user_id)?;
        Ok(TokenPair {
            access,
            refresh,
            refresh_claims,
        })
    }

    /// Validate and decode a token of either type.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != ACCESS {
            return Err(AuthError::WrongTokenType { expected: ACCESS });
        }
        Ok(claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != REFRESH {
            return Err(AuthError::WrongTokenType { expected: REFRESH });
        }
        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Extractors
// =============================================================================

/// The signed-in, active user behind `Authorization: Bearer <access>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or(AuthError::MissingToken)?;

        let claims = state.jwt.validate_access_token(token).map_err(|e| {
            warn!(error = %e, path = %parts.uri.path(), "Rejected access token");
            e
        })?;

        let user = state
            .db
            .users()
            .get_by_id(claims.user_id()?)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))?;

        if !user.is_active {
            warn!(user_id = user.id, "Inactive user presented a token");
            return Err(AuthError::Inactive.into());
        }

        Ok(AuthUser(user))
    }
}

/// An [`AuthUser`] with `is_staff`; anyone else gets 403.
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ApiError::forbidden("Staff access required"));
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(
            "test-secret-test-secret-test-secret",
            Duration::minutes(60),
            Duration::days(7),
        )
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = manager();
        let access_token = manager.generate_access_token(42).unwrap();

        let claims = manager.validate_access_token(&access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_refresh_token() {
        let manager = manager();
        let pair = manager.issue_pair(7).unwrap();

        let claims = manager.validate_refresh_token(&pair.refresh).unwrap();
        assert_eq!(claims.token_type, "refresh");
        assert_eq!(claims.jti, pair.refresh_claims.jti);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
        assert_ne!(pair.access, pair.refresh);
    }

    #[test]
    fn test_wrong_token_type() {
        let manager = manager();
        let pair = manager.issue_pair(1).unwrap();

        assert!(matches!(
            manager.validate_refresh_token(&pair.access),
            Err(AuthError::WrongTokenType { expected: "refresh" })
        ));
        assert!(matches!(
            manager.validate_access_token(&pair.refresh),
            Err(AuthError::WrongTokenType { expected: "access" })
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = JwtManager::new(
            "another-secret-another-secret-xx",
            Duration::minutes(60),
            Duration::days(7),
        );
        let token = other.generate_access_token(1).unwrap();
        assert!(matches!(
            manager().validate_access_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new(
            "test-secret-test-secret-test-secret",
            Duration::seconds(-10),
            Duration::days(7),
        );
        let token = manager.generate_access_token(1).unwrap();
        assert!(manager.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
