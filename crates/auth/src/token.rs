//! Session token issuance and validation (HS256 JWT).
//!
//! Tokens are stateless, time-bounded assertions binding a user id to the
//! role name at issuance. The role claim is a snapshot: a later role change
//! does not affect an outstanding token until it expires or is reissued.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::UserId;

use crate::config::TokenConfig;
use crate::roles::RoleName;

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — user id.
    pub sub: UserId,
    /// Role name at issuance (snapshot).
    pub role: RoleName,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Session validation failure taxonomy.
///
/// The variants are distinguished for logging/tests; the HTTP boundary
/// collapses every one of them to the same 401 outward signal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token missing")]
    Missing,

    #[error("token expired")]
    Expired,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("crypto failure: {0}")]
    Crypto(String),
}

/// Validation half of the session contract, object-safe so the HTTP layer
/// can hold it behind `Arc<dyn TokenValidator>`.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<SessionClaims, TokenError>;
}

/// HS256 issuer/validator sharing one out-of-band secret.
pub struct Hs256TokenCodec {
    config: TokenConfig,
}

impl Hs256TokenCodec {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.config.ttl_secs
    }

    /// Issue a signed token for `user_id` carrying `role` as the snapshot
    /// role claim, expiring `ttl_secs` from `now`.
    pub fn issue(
        &self,
        user_id: UserId,
        role: RoleName,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = SessionClaims {
            sub: user_id,
            role,
            iss: self.config.issuer.clone(),
            iat,
            exp: iat + self.config.ttl_secs as i64,
        };

        let key = EncodingKey::from_secret(self.config.secret.as_bytes());
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| TokenError::Crypto(format!("encode: {e}")))
    }
}

impl TokenValidator for Hs256TokenCodec {
    /// Check signature integrity, expiry, and issuer. Purely stateless — the
    /// caller's *current* role is never consulted here.
    fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let key = DecodingKey::from_secret(self.config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }
}
