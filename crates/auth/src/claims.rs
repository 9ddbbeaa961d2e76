use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roles::MarketRole;

/// Claims of a verified actor token (transport-agnostic).
///
/// Decoding and signature verification happen in a `TokenValidator`; this
/// crate only checks what the claims say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorClaims {
    /// GLN of the market participant the token was issued to.
    pub actor_gln: String,

    pub roles: Vec<MarketRole>,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Deterministically validate token claims against `now`.
pub fn validate_claims(claims: &ActorClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Verifies a raw bearer token and yields its claims.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<ActorClaims, TokenValidationError>;
}

/// Validator over a fixed token table (development and tests).
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, ActorClaims>,
}

impl StaticTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, claims: ActorClaims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<ActorClaims, TokenValidationError> {
        let claims = self
            .tokens
            .get(token)
            .ok_or_else(|| TokenValidationError::Rejected("unknown token".to_string()))?;
        validate_claims(claims, now)?;
        Ok(claims.clone())
    }
}
