//! Authentication gate in front of the market processes.
//!
//! Every failure carries its reason; there is no silent "anonymous" fallback.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use marketroles_processes::GlnNumber;

use crate::claims::TokenValidator;
use crate::roles::MarketRole;

const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("no authorization header present")]
    MissingAuthorizationHeader,

    #[error("unsupported authorization scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// An authenticated market participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub gln: GlnNumber,
    pub roles: Vec<MarketRole>,
}

impl Actor {
    pub fn has_role(&self, role: MarketRole) -> bool {
        self.roles.contains(&role)
    }

    /// Whether this actor is the participant identified by `gln`.
    pub fn acts_as(&self, gln: &str) -> bool {
        self.gln.as_str() == gln.trim()
    }
}

/// Split an `Authorization` header into a bearer token.
fn extract_bearer(header: &str) -> Result<&str, AuthenticationError> {
    let header = header.trim();
    let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthenticationError::UnsupportedScheme(scheme.to_string()));
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(AuthenticationError::InvalidToken("empty bearer token".to_string()));
    }
    Ok(token)
}

/// Authenticate the caller from the raw `Authorization` header value.
pub fn authenticate(
    header: Option<&str>,
    validator: &dyn TokenValidator,
    now: DateTime<Utc>,
) -> Result<Actor, AuthenticationError> {
    let result = header
        .ok_or(AuthenticationError::MissingAuthorizationHeader)
        .and_then(extract_bearer)
        .and_then(|token| {
            validator
                .validate(token, now)
                .map_err(|e| AuthenticationError::InvalidToken(e.to_string()))
        })
        .and_then(|claims| {
            let gln = GlnNumber::parse(&claims.actor_gln)
                .map_err(|e| AuthenticationError::InvalidToken(e.to_string()))?;
            Ok(Actor {
                gln,
                roles: claims.roles,
            })
        });

    match &result {
        Ok(actor) => debug!(actor = %actor.gln, "actor authenticated"),
        Err(err) => warn!(error = %err, "authentication failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ActorClaims, StaticTokenValidator};
    use chrono::Duration;

    fn validator(now: DateTime<Utc>) -> StaticTokenValidator {
        let claims = |gln: &str| ActorClaims {
            actor_gln: gln.to_string(),
            roles: vec![MarketRole::EnergySupplier],
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(10),
        };
        StaticTokenValidator::new()
            .with_token("good", claims("5799000000008"))
            .with_token("bad-gln", claims("123"))
    }

    #[test]
    fn valid_bearer_token_yields_the_actor() {
        let now = Utc::now();
        let actor = authenticate(Some("Bearer good"), &validator(now), now).unwrap();
        assert!(actor.acts_as("5799000000008"));
        assert!(actor.has_role(MarketRole::EnergySupplier));
        assert!(!actor.has_role(MarketRole::GridOperator));
    }

    #[test]
    fn every_failure_has_its_own_reason() {
        let now = Utc::now();
        let v = validator(now);

        assert_eq!(
            authenticate(None, &v, now),
            Err(AuthenticationError::MissingAuthorizationHeader)
        );
        assert_eq!(
            authenticate(Some("Basic dXNlcjpwdw=="), &v, now),
            Err(AuthenticationError::UnsupportedScheme("Basic".to_string()))
        );
        assert!(matches!(
            authenticate(Some("Bearer unknown"), &v, now),
            Err(AuthenticationError::InvalidToken(msg)) if msg.contains("unknown token")
        ));
        assert!(matches!(
            authenticate(Some("Bearer   "), &v, now),
            Err(AuthenticationError::InvalidToken(_))
        ));
        assert!(matches!(
            authenticate(Some("Bearer good"), &v, now + Duration::hours(1)),
            Err(AuthenticationError::InvalidToken(msg)) if msg.contains("expired")
        ));
        assert!(matches!(
            authenticate(Some("Bearer bad-gln"), &v, now),
            Err(AuthenticationError::InvalidToken(_))
        ));
    }
}
