//! JWT service for session token issuance and verification
//!
//! Session tokens are HS256-signed with a single symmetric secret and carry
//! the user's identity plus `iat`/`exp`. They are stateless: there is no
//! revocation list, and a token stays valid until its expiry passes.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

/// Session lifetime in seconds (7 days)
pub const SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 7;

/// Token service errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed token or expired token
    #[error("Invalid token")]
    InvalidToken,

    #[error("Failed to sign token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),

    #[error("System clock is before the Unix epoch")]
    Clock,

    #[error("JWT secret must not be empty")]
    EmptySecret,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Symmetric HS256 secret
    secret: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self { secret })
    }
}

/// Identity fields embedded in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
}

impl From<&User> for SessionIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
        }
    }
}

/// JWT claims structure
///
/// Serialized as `{userId, email, username, name, iat, exp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is compared against our own clock in `verify_at`, so the
        // library check is off; `exp` must still be present.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        JwtService {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Issue a session token for the given identity, valid for seven days
    pub fn issue(&self, identity: &SessionIdentity) -> Result<String, TokenError> {
        self.issue_at(identity, unix_now()?)
    }

    /// Issue a session token as if it had been created at `issued_at`
    pub fn issue_at(&self, identity: &SessionIdentity, issued_at: u64) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            username: identity.username.clone(),
            name: identity.name.clone(),
            iat: issued_at,
            exp: issued_at + SESSION_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, unix_now()?)
    }

    /// Verify a token against the given current time
    ///
    /// A token is rejected at and after its `exp` second.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;

        if now >= token_data.claims.exp {
            return Err(TokenError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::Clock)
}
