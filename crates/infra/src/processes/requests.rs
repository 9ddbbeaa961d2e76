//! Request and effectuation flow shared by move-in and change of supplier.

use chrono::NaiveDate;
use tracing::{info, warn};

use marketroles_core::{
    AggregateRoot, BusinessRulesValidationResult, ExpectedVersion, InternalCommandPayload,
    MessageId, ProcessId, TransactionId,
};
use marketroles_edi::{DocumentHeader, MarketDocument, OutboundErrorMessage};
use marketroles_processes::{
    AccountingPoint, DocumentKind, GlnNumber, MarketViolation, OutboundMessage, ProcessKind,
    effectuation,
};

use crate::outbox::{CommandOutcome, HandlerContext, HandlerError};

use super::MarketHandlers;

/// A market request that registers a business process on an accounting point.
pub(crate) trait ProcessRequest: InternalCommandPayload {
    const PROCESS: ProcessKind;

    /// Command enqueued once the request is confirmed.
    type Effectuation: InternalCommandPayload;

    fn transaction_id(&self) -> &TransactionId;
    fn process_id(&self) -> &ProcessId;
    fn accounting_point_id(&self) -> &str;
    fn energy_supplier_gln(&self) -> &str;
    fn sender_gln(&self) -> &str;
    fn effective_date(&self) -> NaiveDate;

    fn validate(&self, point: Option<&AccountingPoint>) -> BusinessRulesValidationResult<MarketViolation>;

    fn effectuation(&self) -> Self::Effectuation;
}

/// Validate the request and answer it with a Confirm or Reject document.
pub(crate) fn handle_request<R: ProcessRequest>(
    handlers: &MarketHandlers,
    request: R,
    ctx: &mut HandlerContext<'_>,
) -> Result<CommandOutcome, HandlerError> {
    let point = ctx.accounting_points().find(request.accounting_point_id())?;
    let result = request.validate(point.as_ref());

    if !result.success() {
        let reasons = handlers.converters().convert_all(&result)?;
        let codes: Vec<String> = reasons.iter().map(|r| r.code.clone()).collect();
        answer(handlers, &request, ctx, Some(reasons))?;
        info!(
            transaction_id = %request.transaction_id(),
            process = %R::PROCESS,
            codes = ?codes,
            "request rejected"
        );
        return Ok(CommandOutcome::Rejected { codes });
    }

    let Some(mut point) = point else {
        return Err(HandlerError::Failed(format!(
            "accounting point {} vanished after validation",
            request.accounting_point_id()
        )));
    };
    let expected = ExpectedVersion::of(&point);
    point.register_process(
        request.process_id().clone(),
        R::PROCESS,
        GlnNumber::parse(request.energy_supplier_gln())?,
        request.effective_date(),
    )?;
    ctx.accounting_points().save(point, expected)?;

    answer(handlers, &request, ctx, None)?;
    ctx.enqueue(&request.effectuation())?;

    info!(
        transaction_id = %request.transaction_id(),
        process = %R::PROCESS,
        process_id = %request.process_id(),
        "request confirmed"
    );
    Ok(CommandOutcome::Completed)
}

/// Attach the answer document to the request's transaction.
/// `reasons` present means a rejection.
fn answer<R: ProcessRequest>(
    handlers: &MarketHandlers,
    request: &R,
    ctx: &mut HandlerContext<'_>,
    reasons: Option<Vec<OutboundErrorMessage>>,
) -> Result<(), HandlerError> {
    let header = DocumentHeader {
        message_id: MessageId::new(),
        process: R::PROCESS.into(),
        sender: handlers.administrator_gln().as_str(),
        receiver: request.sender_gln(),
        transaction_id: request.transaction_id(),
        accounting_point_id: request.accounting_point_id(),
        created_at: ctx.now,
    };
    let (document, kind) = match reasons {
        Some(reasons) => (MarketDocument::reject(header, reasons), DocumentKind::Reject),
        None => (MarketDocument::confirm(header), DocumentKind::Confirm),
    };

    let mut transaction = ctx.transactions().get(request.transaction_id())?;
    let expected = ExpectedVersion::of(&transaction);
    transaction.attach(OutboundMessage {
        id: document.id,
        document: kind,
        recipient: request.sender_gln().to_string(),
        payload: document.to_json(),
        created_at: ctx.now,
    })?;
    ctx.transactions().save(transaction, expected)?;
    Ok(())
}

/// Complete a pending process of kind `process`; the accounting point's
/// supplier switches.
pub(crate) fn effectuate(
    ctx: &mut HandlerContext<'_>,
    process: ProcessKind,
    accounting_point_id: &str,
    process_id: &ProcessId,
) -> Result<CommandOutcome, HandlerError> {
    let point = ctx.accounting_points().find(accounting_point_id)?;
    let result = effectuation::validate(process, accounting_point_id, point.as_ref(), process_id);

    if !result.success() {
        let codes: Vec<String> = result.codes().into_iter().map(str::to_string).collect();
        warn!(
            accounting_point_id,
            process = %process,
            process_id = %process_id,
            codes = ?codes,
            "effectuation rejected"
        );
        return Ok(CommandOutcome::Rejected { codes });
    }

    let Some(mut point) = point else {
        return Err(HandlerError::Failed(format!(
            "accounting point {accounting_point_id} vanished after validation"
        )));
    };
    let expected = ExpectedVersion::of(&point);
    point.effectuate(process_id)?;
    info!(
        accounting_point_id,
        process_id = %process_id,
        version = point.version(),
        "process effectuated"
    );
    ctx.accounting_points().save(point, expected)?;
    Ok(CommandOutcome::Completed)
}
