use chrono::NaiveDate;

use marketroles_core::{BusinessRulesValidationResult, ProcessId, TransactionId};
use marketroles_processes::{
    AccountingPoint, EffectuateMoveIn, MarketViolation, ProcessKind, RequestMoveIn, move_in,
};

use crate::outbox::{CommandOutcome, HandlerContext, HandlerError};

use super::MarketHandlers;
use super::requests::{self, ProcessRequest};

impl ProcessRequest for RequestMoveIn {
    const PROCESS: ProcessKind = ProcessKind::MoveIn;
    type Effectuation = EffectuateMoveIn;

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
        move_in::validate_request(self, point)
    }

    fn effectuation(&self) -> EffectuateMoveIn {
        EffectuateMoveIn {
            accounting_point_id: self.accounting_point_id.clone(),
            process_id: self.process_id.clone(),
        }
    }
}

pub fn handle_request_move_in(
    handlers: &MarketHandlers,
    request: RequestMoveIn,
    ctx: &mut HandlerContext<'_>,
) -> Result<CommandOutcome, HandlerError> {
    requests::handle_request(handlers, request, ctx)
}

pub fn handle_effectuate_move_in(
    command: EffectuateMoveIn,
    ctx: &mut HandlerContext<'_>,
) -> Result<CommandOutcome, HandlerError> {
    requests::effectuate(ctx, ProcessKind::MoveIn, &command.accounting_point_id, &command.process_id)
}
