use chrono::NaiveDate;

use marketroles_core::{BusinessRulesValidationResult, ProcessId, TransactionId};
use marketroles_processes::{
    AccountingPoint, EffectuateChangeOfSupplier, MarketViolation, ProcessKind,
    RequestChangeOfSupplier, change_of_supplier,
};

use crate::outbox::{CommandOutcome, HandlerContext, HandlerError};

use super::MarketHandlers;
use super::requests::{self, ProcessRequest};

impl ProcessRequest for RequestChangeOfSupplier {
    const PROCESS: ProcessKind = ProcessKind::ChangeOfSupplier;
    type Effectuation = EffectuateChangeOfSupplier;

    fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    fn process_id(&self) -> &ProcessId {
        &self.process_id
    }

    fn accounting_point_id(&self) -> &str {
        &self.accounting_point_id
    }

    fn energy_supplier_gln(&self) -> &str {
        &self.energy_supplier_gln
    }

    fn sender_gln(&self) -> &str {
        &self.sender_gln
    }

    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    fn validate(&self, point: Option<&AccountingPoint>) -> BusinessRulesValidationResult<MarketViolation> {
        change_of_supplier::validate_request(self, point)
    }

    fn effectuation(&self) -> EffectuateChangeOfSupplier {
        EffectuateChangeOfSupplier {
            accounting_point_id: self.accounting_point_id.clone(),
            process_id: self.process_id.clone(),
        }
    }
}

/// Answer a change of supplier; a confirmed one is effectuated by a follow-up command.
pub fn handle_request_change_of_supplier(
    handlers: &MarketHandlers,
    request: RequestChangeOfSupplier,
    ctx: &mut HandlerContext<'_>,
) -> Result<CommandOutcome, HandlerError> {
    requests::handle_request(handlers, request, ctx)
}

pub fn handle_effectuate_change_of_supplier(
    command: EffectuateChangeOfSupplier,
    ctx: &mut HandlerContext<'_>,
) -> Result<CommandOutcome, HandlerError> {
    requests::effectuate(
        ctx,
        ProcessKind::ChangeOfSupplier,
        &command.accounting_point_id,
        &command.process_id,
    )
}
