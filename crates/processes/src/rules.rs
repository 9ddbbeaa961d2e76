//! Concrete market business rules.
//!
//! Every rule captures the values it needs when constructed; evaluation never
//! looks anything up.

use chrono::NaiveDate;

use marketroles_core::{BusinessRule, ProcessId};

use crate::accounting_point::{AccountingPoint, ProcessKind, ProcessStatus};
use crate::identifiers::{GlnNumber, Gsrn};
use crate::violation::MarketViolation;

pub struct AccountingPointIdMustBeValidRule {
    accounting_point_id: String,
}

impl AccountingPointIdMustBeValidRule {
    pub fn new(accounting_point_id: impl Into<String>) -> Self {
        Self {
            accounting_point_id: accounting_point_id.into(),
        }
    }
}

impl BusinessRule for AccountingPointIdMustBeValidRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        !Gsrn::is_valid(&self.accounting_point_id)
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::InvalidAccountingPointId {
            accounting_point_id: self.accounting_point_id.clone(),
        }
    }
}

pub struct AccountingPointMustExistRule {
    accounting_point_id: String,
    exists: bool,
}

impl AccountingPointMustExistRule {
    pub fn new(accounting_point_id: impl Into<String>, point: Option<&AccountingPoint>) -> Self {
        Self {
            accounting_point_id: accounting_point_id.into(),
            exists: point.is_some(),
        }
    }
}

impl BusinessRule for AccountingPointMustExistRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        !self.exists
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::UnknownAccountingPoint {
            accounting_point_id: self.accounting_point_id.clone(),
        }
    }
}

pub struct GlnNumberMustBeValidRule {
    gln: String,
}

impl GlnNumberMustBeValidRule {
    pub fn new(gln: impl Into<String>) -> Self {
        Self { gln: gln.into() }
    }
}

impl BusinessRule for GlnNumberMustBeValidRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        !GlnNumber::is_valid(&self.gln)
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::InvalidGlnNumber {
            gln: self.gln.clone(),
        }
    }
}

/// The sender of a request must be the energy supplier it acts for.
pub struct SenderMustBeEnergySupplierRule {
    sender: String,
    energy_supplier: String,
}

impl SenderMustBeEnergySupplierRule {
    pub fn new(sender: impl Into<String>, energy_supplier: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            energy_supplier: energy_supplier.into(),
        }
    }
}

impl BusinessRule for SenderMustBeEnergySupplierRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        self.sender.trim() != self.energy_supplier.trim()
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::SenderMismatch {
            sender: self.sender.clone(),
            energy_supplier: self.energy_supplier.clone(),
        }
    }
}

/// At most one process of a kind per accounting point and effective date,
/// counting effectuated ones.
pub struct BusinessProcessMustNotBeRegisteredOnSameDateRule {
    accounting_point_id: String,
    process: ProcessKind,
    effective_date: NaiveDate,
    already_registered: bool,
}

impl BusinessProcessMustNotBeRegisteredOnSameDateRule {
    pub fn new(
        accounting_point_id: impl Into<String>,
        point: Option<&AccountingPoint>,
        process: ProcessKind,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            accounting_point_id: accounting_point_id.into(),
            process,
            effective_date,
            already_registered: point
                .is_some_and(|p| p.has_process_on(process, effective_date)),
        }
    }
}

impl BusinessRule for BusinessProcessMustNotBeRegisteredOnSameDateRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        self.already_registered
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::BusinessProcessRegisteredOnSameDate {
            process: self.process,
            accounting_point_id: self.accounting_point_id.clone(),
            effective_date: self.effective_date,
        }
    }
}

/// A change of supplier needs a current energy supplier to change from.
pub struct MustHaveEnergySupplierAssociatedRule {
    accounting_point_id: String,
    energy_supplier: Option<GlnNumber>,
}

impl MustHaveEnergySupplierAssociatedRule {
    pub fn new(accounting_point_id: impl Into<String>, energy_supplier: Option<GlnNumber>) -> Self {
        Self {
            accounting_point_id: accounting_point_id.into(),
            energy_supplier,
        }
    }

    pub fn for_point(accounting_point_id: impl Into<String>, point: Option<&AccountingPoint>) -> Self {
        Self::new(
            accounting_point_id,
            point.and_then(|p| p.energy_supplier().cloned()),
        )
    }
}

impl BusinessRule for MustHaveEnergySupplierAssociatedRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        self.energy_supplier.is_none()
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::MissingEnergySupplier {
            accounting_point_id: self.accounting_point_id.clone(),
        }
    }
}

pub struct BusinessProcessMustBePendingRule {
    accounting_point_id: String,
    process_id: ProcessId,
    status: Option<ProcessStatus>,
}

impl BusinessProcessMustBePendingRule {
    pub fn new(
        accounting_point_id: impl Into<String>,
        point: Option<&AccountingPoint>,
        process_id: ProcessId,
    ) -> Self {
        let status = point.and_then(|p| p.process(&process_id)).map(|p| p.status);
        Self {
            accounting_point_id: accounting_point_id.into(),
            process_id,
            status,
        }
    }
}

impl BusinessRule for BusinessProcessMustBePendingRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        self.status != Some(ProcessStatus::Pending)
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::BusinessProcessNotPending {
            process_id: self.process_id.clone(),
            accounting_point_id: self.accounting_point_id.clone(),
        }
    }
}

/// A process id identifies one process on an accounting point.
pub struct BusinessProcessIdMustBeUniqueRule {
    accounting_point_id: String,
    process_id: ProcessId,
    already_registered: bool,
}

impl BusinessProcessIdMustBeUniqueRule {
    pub fn new(
        accounting_point_id: impl Into<String>,
        point: Option<&AccountingPoint>,
        process_id: ProcessId,
    ) -> Self {
        Self {
            accounting_point_id: accounting_point_id.into(),
            already_registered: point.is_some_and(|p| p.process(&process_id).is_some()),
            process_id,
        }
    }
}

impl BusinessRule for BusinessProcessIdMustBeUniqueRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        self.already_registered
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::BusinessProcessIdAlreadyRegistered {
            process_id: self.process_id.clone(),
            accounting_point_id: self.accounting_point_id.clone(),
        }
    }
}

/// An effectuation command only completes a process of its own kind. Unknown
/// processes are left to `BusinessProcessMustBePendingRule`.
pub struct BusinessProcessMustBeOfKindRule {
    accounting_point_id: String,
    process_id: ProcessId,
    expected: ProcessKind,
    registered: Option<ProcessKind>,
}

impl BusinessProcessMustBeOfKindRule {
    pub fn new(
        accounting_point_id: impl Into<String>,
        point: Option<&AccountingPoint>,
        process_id: ProcessId,
        expected: ProcessKind,
    ) -> Self {
        let registered = point.and_then(|p| p.process(&process_id)).map(|p| p.kind);
        Self {
            accounting_point_id: accounting_point_id.into(),
            process_id,
            expected,
            registered,
        }
    }
}

impl BusinessRule for BusinessProcessMustBeOfKindRule {
    type Violation = MarketViolation;

    fn is_broken(&self) -> bool {
        self.registered.is_some_and(|kind| kind != self.expected)
    }

    fn violation(&self) -> MarketViolation {
        MarketViolation::BusinessProcessKindMismatch {
            process_id: self.process_id.clone(),
            accounting_point_id: self.accounting_point_id.clone(),
            expected: self.expected,
            registered: self.registered.unwrap_or(self.expected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketroles_core::{RuleSet, Violation};

    const GSRN: &str = "571313123456789018";
    const SUPPLIER: &str = "5799000000008";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()
    }

    fn point() -> AccountingPoint {
        AccountingPoint::new(Gsrn::parse(GSRN).unwrap())
    }

    #[test]
    fn missing_energy_supplier_yields_exactly_one_violation() {
        let result = RuleSet::new()
            .with(MustHaveEnergySupplierAssociatedRule::new(GSRN, None))
            .evaluate();

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.codes(), vec!["E0H"]);
    }

    #[test]
    fn same_date_rule_only_sees_processes_of_the_same_kind() {
        let mut point = point();
        point
            .register_process(
                ProcessId::new("P1").unwrap(),
                ProcessKind::MoveIn,
                GlnNumber::parse(SUPPLIER).unwrap(),
                date(),
            )
            .unwrap();

        let same = BusinessProcessMustNotBeRegisteredOnSameDateRule::new(
            GSRN,
            Some(&point),
            ProcessKind::MoveIn,
            date(),
        );
        assert!(same.is_broken());
        assert_eq!(same.violation().code(), "D07");

        let other_kind = BusinessProcessMustNotBeRegisteredOnSameDateRule::new(
            GSRN,
            Some(&point),
            ProcessKind::ChangeOfSupplier,
            date(),
        );
        assert!(!other_kind.is_broken());

        let other_date = BusinessProcessMustNotBeRegisteredOnSameDateRule::new(
            GSRN,
            Some(&point),
            ProcessKind::MoveIn,
            date().succ_opt().unwrap(),
        );
        assert!(!other_date.is_broken());

        point.effectuate(&ProcessId::new("P1").unwrap()).unwrap();
        let after_effectuation = BusinessProcessMustNotBeRegisteredOnSameDateRule::new(
            GSRN,
            Some(&point),
            ProcessKind::MoveIn,
            date(),
        );
        assert!(after_effectuation.is_broken());
    }

    #[test]
    fn process_id_must_not_be_reused_on_the_point() {
        let mut point = point();
        let process_id = ProcessId::new("P1").unwrap();
        assert!(
            !BusinessProcessIdMustBeUniqueRule::new(GSRN, Some(&point), process_id.clone())
                .is_broken()
        );
        assert!(
            !BusinessProcessIdMustBeUniqueRule::new(GSRN, None, process_id.clone()).is_broken()
        );

        point
            .register_process(
                process_id.clone(),
                ProcessKind::MoveIn,
                GlnNumber::parse(SUPPLIER).unwrap(),
                date(),
            )
            .unwrap();
        let rule = BusinessProcessIdMustBeUniqueRule::new(GSRN, Some(&point), process_id);
        assert!(rule.is_broken());
        assert_eq!(rule.violation().code(), "D13");
    }

    #[test]
    fn effectuation_kind_must_match_the_registered_process() {
        let mut point = point();
        let process_id = ProcessId::new("P1").unwrap();
        point
            .register_process(
                process_id.clone(),
                ProcessKind::MoveIn,
                GlnNumber::parse(SUPPLIER).unwrap(),
                date(),
            )
            .unwrap();

        assert!(!BusinessProcessMustBeOfKindRule::new(
            GSRN,
            Some(&point),
            process_id.clone(),
            ProcessKind::MoveIn
        )
        .is_broken());
        let mismatch = BusinessProcessMustBeOfKindRule::new(
            GSRN,
            Some(&point),
            process_id,
            ProcessKind::ChangeOfSupplier,
        );
        assert!(mismatch.is_broken());
        assert_eq!(mismatch.violation().code(), "D14");

        // An unknown process is the pending rule's concern.
        assert!(!BusinessProcessMustBeOfKindRule::new(
            GSRN,
            Some(&point),
            ProcessId::new("P2").unwrap(),
            ProcessKind::ChangeOfSupplier
        )
        .is_broken());
    }

    #[test]
    fn rules_evaluate_the_snapshot_taken_at_construction() {
        let mut point = point();
        let process_id = ProcessId::new("P1").unwrap();
        point
            .register_process(
                process_id.clone(),
                ProcessKind::MoveIn,
                GlnNumber::parse(SUPPLIER).unwrap(),
                date(),
            )
            .unwrap();

        let rule = BusinessProcessMustBePendingRule::new(GSRN, Some(&point), process_id.clone());
        point.effectuate(&process_id).unwrap();

        assert!(!rule.is_broken());
        assert!(BusinessProcessMustBePendingRule::new(GSRN, Some(&point), process_id).is_broken());
    }

    #[test]
    fn identification_rules() {
        assert!(!AccountingPointIdMustBeValidRule::new(GSRN).is_broken());
        assert!(AccountingPointIdMustBeValidRule::new("123").is_broken());
        assert!(!GlnNumberMustBeValidRule::new(SUPPLIER).is_broken());
        assert!(GlnNumberMustBeValidRule::new("5799000000009").is_broken());
        assert!(AccountingPointMustExistRule::new(GSRN, None).is_broken());
        assert!(!AccountingPointMustExistRule::new(GSRN, Some(&point())).is_broken());
        assert!(SenderMustBeEnergySupplierRule::new("5799000000015", SUPPLIER).is_broken());
        assert!(!SenderMustBeEnergySupplierRule::new(SUPPLIER, SUPPLIER).is_broken());
    }
}
