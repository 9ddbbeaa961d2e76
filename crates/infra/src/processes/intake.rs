use tracing::info;

use marketroles_core::CommandId;
use marketroles_processes::{RequestChangeOfSupplier, RequestMoveIn, Transaction};

use crate::outbox::{CommandScheduler, StoreError, UnitOfWork};
use crate::repositories::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// `AlreadyExists` here means the transaction id was already received.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Register the request's transaction and enqueue it for processing, both in
/// the caller's unit of work.
pub fn receive_move_in(
    uow: &mut dyn UnitOfWork,
    request: &RequestMoveIn,
) -> Result<CommandId, IntakeError> {
    uow.transactions()
        .add(Transaction::new(request.transaction_id.clone()))?;
    let command_id = uow.enqueue(request)?;
    info!(
        transaction_id = %request.transaction_id,
        command_id = %command_id,
        "move-in request received"
    );
    Ok(command_id)
}

pub fn receive_change_of_supplier(
    uow: &mut dyn UnitOfWork,
    request: &RequestChangeOfSupplier,
) -> Result<CommandId, IntakeError> {
    uow.transactions()
        .add(Transaction::new(request.transaction_id.clone()))?;
    let command_id = uow.enqueue(request)?;
    info!(
        transaction_id = %request.transaction_id,
        command_id = %command_id,
        "change of supplier request received"
    );
    Ok(command_id)
}
