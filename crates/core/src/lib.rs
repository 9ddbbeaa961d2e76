//! `marketroles-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, aggregate/version tracking, the
//! internal-command payload contract and the business-rule evaluation pipeline.

pub mod aggregate;
pub mod command;
pub mod error;
pub mod id;
pub mod rules;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use command::InternalCommandPayload;
pub use error::{DomainError, DomainResult};
pub use id::{CommandId, MessageId, ProcessId, TransactionId};
pub use rules::{BusinessRule, BusinessRulesValidationResult, RuleSet, Violation, validate};
pub use value_object::ValueObject;
