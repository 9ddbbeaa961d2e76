//! Move-in: a new customer moves into an accounting point with a chosen
//! energy supplier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use marketroles_core::{
    BusinessRulesValidationResult, InternalCommandPayload, ProcessId, RuleSet, TransactionId,
};

use crate::accounting_point::{AccountingPoint, ProcessKind};
use crate::rules::{
    AccountingPointIdMustBeValidRule, AccountingPointMustExistRule,
    BusinessProcessIdMustBeUniqueRule, BusinessProcessMustNotBeRegisteredOnSameDateRule,
    GlnNumberMustBeValidRule, SenderMustBeEnergySupplierRule,
};
use crate::violation::MarketViolation;

/// Internal command: validate and register a received move-in request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMoveIn {
    pub transaction_id: TransactionId,
    pub process_id: ProcessId,
    pub accounting_point_id: String,
    pub energy_supplier_gln: String,
    pub sender_gln: String,
    pub effective_date: NaiveDate,
}

impl InternalCommandPayload for RequestMoveIn {
    const KIND: &'static str = "RequestMoveIn";
}

/// Internal command: effectuate a confirmed move-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectuateMoveIn {
    pub accounting_point_id: String,
    pub process_id: ProcessId,
}

impl InternalCommandPayload for EffectuateMoveIn {
    const KIND: &'static str = "EffectuateMoveIn";
}

/// Evaluate the move-in request rules against the accounting point snapshot.
pub fn validate_request(
    request: &RequestMoveIn,
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
        .with(BusinessProcessIdMustBeUniqueRule::new(
            &request.accounting_point_id,
            point,
            request.process_id.clone(),
        ))
        .with(BusinessProcessMustNotBeRegisteredOnSameDateRule::new(
            &request.accounting_point_id,
            point,
            ProcessKind::MoveIn,
            request.effective_date,
        ))
        .evaluate()
}
