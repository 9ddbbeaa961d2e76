//! Change of supplier: an energy supplier takes over an accounting point that
//! already has a supplier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use marketroles_core::{
    BusinessRulesValidationResult, InternalCommandPayload, ProcessId, RuleSet, TransactionId,
};

use crate::accounting_point::{AccountingPoint, ProcessKind};
use crate::rules::{
    AccountingPointIdMustBeValidRule, AccountingPointMustExistRule,
    BusinessProcessIdMustBeUniqueRule, BusinessProcessMustNotBeRegisteredOnSameDateRule,
    GlnNumberMustBeValidRule, MustHaveEnergySupplierAssociatedRule,
    SenderMustBeEnergySupplierRule,
};
use crate::violation::MarketViolation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestChangeOfSupplier {
    pub transaction_id: TransactionId,
    pub process_id: ProcessId,
    pub accounting_point_id: String,
    pub energy_supplier_gln: String,
    pub sender_gln: String,
    pub effective_date: NaiveDate,
}

impl InternalCommandPayload for RequestChangeOfSupplier {
    const KIND: &'static str = "RequestChangeOfSupplier";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectuateChangeOfSupplier {
    pub accounting_point_id: String,
    pub process_id: ProcessId,
}

impl InternalCommandPayload for EffectuateChangeOfSupplier {
    const KIND: &'static str = "EffectuateChangeOfSupplier";
}

pub fn validate_request(
    request: &RequestChangeOfSupplier,
    point: Option<&AccountingPoint>,
) -> BusinessRulesValidationResult<MarketViolation> {
    RuleSet::new()
        .with(AccountingPointIdMustBeValidRule::new(&request.accounting_point_id))
        .with(AccountingPointMustExistRule::new(&request.accounting_point_id, point))
        .with(GlnNumberMustBeValidRule::new(&request.energy_supplier_gln))
        .with(SenderMustBeEnergySupplierRule::new(
            &request.sender_gln,
            &request.energy_supplier_gln,
        ))
        .with(MustHaveEnergySupplierAssociatedRule::for_point(
            &request.accounting_point_id,
            point,
        ))
        .with(BusinessProcessIdMustBeUniqueRule::new(
            &request.accounting_point_id,
            point,
            request.process_id.clone(),
        ))
        .with(BusinessProcessMustNotBeRegisteredOnSameDateRule::new(
            &request.accounting_point_id,
            point,
            ProcessKind::ChangeOfSupplier,
            request.effective_date,
        ))
        .evaluate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{GlnNumber, Gsrn};

    const GSRN: &str = "571313123456789025";
    const CURRENT: &str = "5799000000008";
    const NEW: &str = "5799000000015";

    fn request() -> RequestChangeOfSupplier {
        RequestChangeOfSupplier {
            transaction_id: TransactionId::new("tx-cos").unwrap(),
            process_id: ProcessId::new("COS-1").unwrap(),
            accounting_point_id: GSRN.to_string(),
            energy_supplier_gln: NEW.to_string(),
            sender_gln: NEW.to_string(),
            effective_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        }
    }

    #[test]
    fn point_without_supplier_is_rejected_with_e0h_only() {
        let point = AccountingPoint::new(Gsrn::parse(GSRN).unwrap());
        let result = validate_request(&request(), Some(&point));
        assert_eq!(result.codes(), vec!["E0H"]);
    }

    #[test]
    fn point_with_supplier_accepts_the_request() {
        let point = AccountingPoint::new(Gsrn::parse(GSRN).unwrap())
            .with_energy_supplier(GlnNumber::parse(CURRENT).unwrap());
        assert!(validate_request(&request(), Some(&point)).success());
    }

    #[test]
    fn sender_acting_for_another_supplier_is_rejected_with_e16() {
        let point = AccountingPoint::new(Gsrn::parse(GSRN).unwrap())
            .with_energy_supplier(GlnNumber::parse(CURRENT).unwrap());
        let mut request = request();
        request.sender_gln = CURRENT.to_string();
        assert_eq!(validate_request(&request, Some(&point)).codes(), vec!["E16"]);
    }

    #[test]
    fn process_id_already_used_by_a_move_in_is_rejected() {
        let mut point = AccountingPoint::new(Gsrn::parse(GSRN).unwrap())
            .with_energy_supplier(GlnNumber::parse(CURRENT).unwrap());
        point
            .register_process(
                ProcessId::new("COS-1").unwrap(),
                ProcessKind::MoveIn,
                GlnNumber::parse(CURRENT).unwrap(),
                NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            )
            .unwrap();

        assert_eq!(validate_request(&request(), Some(&point)).codes(), vec!["D13"]);
    }
}
