//! Energy-market business processes (move-in, change of supplier,
//! aggregation forwarding).
//!
//! Pure domain logic: identifiers, rule violations, business rules, the
//! accounting point and transaction aggregates, and the typed internal
//! commands exchanged through the outbox. No IO, no storage.

pub mod accounting_point;
pub mod aggregation;
pub mod change_of_supplier;
pub mod effectuation;
pub mod identifiers;
pub mod move_in;
pub mod rules;
pub mod transaction;
pub mod violation;

use marketroles_core::InternalCommandPayload;

pub use accounting_point::{AccountingPoint, BusinessProcess, ProcessKind, ProcessStatus};
pub use aggregation::ForwardAggregationResult;
pub use change_of_supplier::{EffectuateChangeOfSupplier, RequestChangeOfSupplier};
pub use identifiers::{GlnNumber, Gsrn};
pub use move_in::{EffectuateMoveIn, RequestMoveIn};
pub use transaction::{DocumentKind, OutboundMessage, Transaction};
pub use violation::{MarketViolation, ViolationKind};

/// Every internal command kind this crate defines.
pub const COMMAND_KINDS: &[&str] = &[
    RequestMoveIn::KIND,
    EffectuateMoveIn::KIND,
    RequestChangeOfSupplier::KIND,
    EffectuateChangeOfSupplier::KIND,
    ForwardAggregationResult::KIND,
];
