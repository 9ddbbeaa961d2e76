//! Market rule violations and their stable wire codes.

use chrono::NaiveDate;

use marketroles_core::{ProcessId, Violation};

use crate::accounting_point::ProcessKind;

/// Stable rejection reason codes. Never renumber: downstream EDI consumers
/// key business logic on them.
pub mod codes {
    /// Invalid or unknown identification.
    pub const E10: &str = "E10";
    /// Sender identity mismatch.
    pub const E16: &str = "E16";
    /// No energy supplier on the accounting point.
    pub const E0H: &str = "E0H";
    /// Effective-date precedence conflict.
    pub const D07: &str = "D07";
    /// Process identifier already in use on the accounting point.
    pub const D13: &str = "D13";
    /// Business process is not in a state that allows the request.
    pub const D14: &str = "D14";
}

/// Closed set of violation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    InvalidAccountingPointId,
    UnknownAccountingPoint,
    InvalidGlnNumber,
    SenderMismatch,
    BusinessProcessRegisteredOnSameDate,
    MissingEnergySupplier,
    BusinessProcessNotPending,
    BusinessProcessIdAlreadyRegistered,
    BusinessProcessKindMismatch,
}

impl ViolationKind {
    pub const ALL: &'static [ViolationKind] = &[
        ViolationKind::InvalidAccountingPointId,
        ViolationKind::UnknownAccountingPoint,
        ViolationKind::InvalidGlnNumber,
        ViolationKind::SenderMismatch,
        ViolationKind::BusinessProcessRegisteredOnSameDate,
        ViolationKind::MissingEnergySupplier,
        ViolationKind::BusinessProcessNotPending,
        ViolationKind::BusinessProcessIdAlreadyRegistered,
        ViolationKind::BusinessProcessKindMismatch,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ViolationKind::InvalidAccountingPointId
            | ViolationKind::UnknownAccountingPoint
            | ViolationKind::InvalidGlnNumber => codes::E10,
            ViolationKind::SenderMismatch => codes::E16,
            ViolationKind::BusinessProcessRegisteredOnSameDate => codes::D07,
            ViolationKind::MissingEnergySupplier => codes::E0H,
            ViolationKind::BusinessProcessNotPending
            | ViolationKind::BusinessProcessKindMismatch => codes::D14,
            ViolationKind::BusinessProcessIdAlreadyRegistered => codes::D13,
        }
    }
}

/// A broken market rule, carrying the offending values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketViolation {
    InvalidAccountingPointId {
        accounting_point_id: String,
    },
    UnknownAccountingPoint {
        accounting_point_id: String,
    },
    InvalidGlnNumber {
        gln: String,
    },
    SenderMismatch {
        sender: String,
        energy_supplier: String,
    },
    BusinessProcessRegisteredOnSameDate {
        process: ProcessKind,
        accounting_point_id: String,
        effective_date: NaiveDate,
    },
    MissingEnergySupplier {
        accounting_point_id: String,
    },
    BusinessProcessNotPending {
        process_id: ProcessId,
        accounting_point_id: String,
    },
    BusinessProcessIdAlreadyRegistered {
        process_id: ProcessId,
        accounting_point_id: String,
    },
    BusinessProcessKindMismatch {
        process_id: ProcessId,
        accounting_point_id: String,
        expected: ProcessKind,
        registered: ProcessKind,
    },
}

impl Violation for MarketViolation {
    type Kind = ViolationKind;

    const KINDS: &'static [ViolationKind] = ViolationKind::ALL;

    fn kind(&self) -> ViolationKind {
        match self {
            MarketViolation::InvalidAccountingPointId { .. } => {
                ViolationKind::InvalidAccountingPointId
            }
            MarketViolation::UnknownAccountingPoint { .. } => ViolationKind::UnknownAccountingPoint,
            MarketViolation::InvalidGlnNumber { .. } => ViolationKind::InvalidGlnNumber,
            MarketViolation::SenderMismatch { .. } => ViolationKind::SenderMismatch,
            MarketViolation::BusinessProcessRegisteredOnSameDate { .. } => {
                ViolationKind::BusinessProcessRegisteredOnSameDate
            }
            MarketViolation::MissingEnergySupplier { .. } => ViolationKind::MissingEnergySupplier,
            MarketViolation::BusinessProcessNotPending { .. } => {
                ViolationKind::BusinessProcessNotPending
            }
            MarketViolation::BusinessProcessIdAlreadyRegistered { .. } => {
                ViolationKind::BusinessProcessIdAlreadyRegistered
            }
            MarketViolation::BusinessProcessKindMismatch { .. } => {
                ViolationKind::BusinessProcessKindMismatch
            }
        }
    }

    fn code(&self) -> &'static str {
        self.kind().code()
    }

    fn message(&self) -> String {
        match self {
            MarketViolation::InvalidAccountingPointId { accounting_point_id } => {
                format!("invalid accounting point id '{accounting_point_id}'")
            }
            MarketViolation::UnknownAccountingPoint { accounting_point_id } => {
                format!("unknown accounting point '{accounting_point_id}'")
            }
            MarketViolation::InvalidGlnNumber { gln } => format!("invalid GLN number '{gln}'"),
            MarketViolation::SenderMismatch {
                sender,
                energy_supplier,
            } => format!("sender '{sender}' does not match energy supplier '{energy_supplier}'"),
            MarketViolation::BusinessProcessRegisteredOnSameDate {
                process,
                accounting_point_id,
                effective_date,
            } => format!(
                "{process} already registered on '{accounting_point_id}' for {effective_date}"
            ),
            MarketViolation::MissingEnergySupplier { accounting_point_id } => {
                format!("no energy supplier on '{accounting_point_id}'")
            }
            MarketViolation::BusinessProcessNotPending {
                process_id,
                accounting_point_id,
            } => format!("process '{process_id}' on '{accounting_point_id}' is not pending"),
            MarketViolation::BusinessProcessIdAlreadyRegistered {
                process_id,
                accounting_point_id,
            } => format!("process id '{process_id}' is already used on '{accounting_point_id}'"),
            MarketViolation::BusinessProcessKindMismatch {
                process_id,
                accounting_point_id,
                expected,
                registered,
            } => format!(
                "process '{process_id}' on '{accounting_point_id}' is a {registered}, not a {expected}"
            ),
        }
    }
}
