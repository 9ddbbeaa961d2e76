use tracing::{debug, info};

use marketroles_core::MessageId;
use marketroles_processes::{DocumentKind, ForwardAggregationResult, OutboundMessage, Transaction};

use crate::outbox::{CommandOutcome, HandlerContext, HandlerError};
use crate::repositories::RepositoryError;

/// Forward an aggregation result at most once per transaction id.
///
/// The transaction row is the forwarding record: when it already exists the
/// result went out before and the command completes without sending again.
pub fn handle_forward_aggregation_result(
    command: ForwardAggregationResult,
    ctx: &mut HandlerContext<'_>,
) -> Result<CommandOutcome, HandlerError> {
    let ForwardAggregationResult {
        transaction_id,
        recipient_gln,
        grid_area,
        result,
    } = command;

    let mut transaction = Transaction::new(transaction_id.clone());
    transaction.attach(OutboundMessage {
        id: MessageId::new(),
        document: DocumentKind::AggregationResult,
        recipient: recipient_gln.clone(),
        payload: serde_json::json!({
            "gridArea": grid_area,
            "result": result,
        }),
        created_at: ctx.now,
    })?;

    match ctx.transactions().add(transaction) {
        Ok(()) => {
            info!(
                transaction_id = %transaction_id,
                recipient = %recipient_gln,
                "aggregation result forwarded"
            );
            Ok(CommandOutcome::Completed)
        }
        Err(RepositoryError::AlreadyExists(_)) => {
            debug!(transaction_id = %transaction_id, "aggregation result already forwarded");
            Ok(CommandOutcome::Completed)
        }
        Err(e) => Err(e.into()),
    }
}
