//! Rules shared by move-in and change-of-supplier effectuation.

use marketroles_core::{BusinessRulesValidationResult, ProcessId, RuleSet};

use crate::accounting_point::{AccountingPoint, ProcessKind};
use crate::rules::{
    AccountingPointMustExistRule, BusinessProcessMustBeOfKindRule,
    BusinessProcessMustBePendingRule,
};
use crate::violation::MarketViolation;

/// Evaluate the rules for completing the `kind` process `process_id`.
pub fn validate(
    kind: ProcessKind,
    accounting_point_id: &str,
    point: Option<&AccountingPoint>,
    process_id: &ProcessId,
) -> BusinessRulesValidationResult<MarketViolation> {
    RuleSet::new()
        .with(AccountingPointMustExistRule::new(accounting_point_id, point))
        .with(BusinessProcessMustBePendingRule::new(
            accounting_point_id,
            point,
            process_id.clone(),
        ))
        .with(BusinessProcessMustBeOfKindRule::new(
            accounting_point_id,
            point,
            process_id.clone(),
            kind,
        ))
        .evaluate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{GlnNumber, Gsrn};
    use crate::violation::ViolationKind;
    use chrono::NaiveDate;
    use marketroles_core::Violation;

    const GSRN: &str = "571313123456789032";

    #[test]
    fn pending_process_can_be_effectuated_once() {
        let mut point = AccountingPoint::new(Gsrn::parse(GSRN).unwrap());
        let process_id = ProcessId::new("P1").unwrap();
        point
            .register_process(
                process_id.clone(),
                ProcessKind::MoveIn,
                GlnNumber::parse("5799000000022").unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            )
            .unwrap();

        assert!(validate(ProcessKind::MoveIn, GSRN, Some(&point), &process_id).success());

        point.effectuate(&process_id).unwrap();
        assert_eq!(
            validate(ProcessKind::MoveIn, GSRN, Some(&point), &process_id).codes(),
            vec!["D14"]
        );
    }

    #[test]
    fn unknown_point_reports_both_violations() {
        let result = validate(ProcessKind::MoveIn, GSRN, None, &ProcessId::new("P1").unwrap());
        assert_eq!(result.codes(), vec!["E10", "D14"]);
    }

    #[test]
    fn effectuating_a_process_of_another_kind_is_rejected_with_d14() {
        let mut point = AccountingPoint::new(Gsrn::parse(GSRN).unwrap());
        let process_id = ProcessId::new("P1").unwrap();
        point
            .register_process(
                process_id.clone(),
                ProcessKind::MoveIn,
                GlnNumber::parse("5799000000022").unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            )
            .unwrap();

        let result = validate(ProcessKind::ChangeOfSupplier, GSRN, Some(&point), &process_id);

        assert_eq!(result.codes(), vec!["D14"]);
        assert_eq!(
            result.errors()[0].kind(),
            ViolationKind::BusinessProcessKindMismatch
        );
    }
}
