//! `marketroles-auth` — authentication gate for market participants.
//!
//! Decoupled from HTTP: callers hand over the raw `Authorization` header value
//! and a `TokenValidator`, and get back an `Actor` or a typed reason.
//!
//! The crate sits in front of intake and is called by the embedding edge,
//! not by `marketroles-infra`. A request is authenticated and the actor is
//! checked with [`Actor::acts_as`] against the request's sender GLN before
//! `receive_move_in` or `receive_change_of_supplier` stages it.

pub mod authenticate;
pub mod claims;
pub mod roles;

pub use authenticate::{Actor, AuthenticationError, authenticate};
pub use claims::{
    ActorClaims, StaticTokenValidator, TokenValidationError, TokenValidator, validate_claims,
};
pub use roles::MarketRole;
