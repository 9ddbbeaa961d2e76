//! Transactional enqueue of typed internal commands.

use chrono::Utc;

use marketroles_core::{CommandId, InternalCommandPayload};

use super::store::StoreError;
use super::types::InternalCommand;
use super::unit_of_work::UnitOfWork;

/// Enqueue typed commands into a unit of work.
///
/// The command becomes durable exactly when the unit of work commits, together
/// with every other change staged in it.
pub trait CommandScheduler {
    fn enqueue<C: InternalCommandPayload>(&mut self, command: &C) -> Result<CommandId, StoreError>;

    /// Enqueue with a caller-supplied id (idempotent producers).
    fn enqueue_with_id<C: InternalCommandPayload>(
        &mut self,
        id: CommandId,
        command: &C,
    ) -> Result<CommandId, StoreError>;
}

impl<U: UnitOfWork + ?Sized> CommandScheduler for U {
    fn enqueue<C: InternalCommandPayload>(&mut self, command: &C) -> Result<CommandId, StoreError> {
        self.enqueue_with_id(CommandId::new(), command)
    }

    fn enqueue_with_id<C: InternalCommandPayload>(
        &mut self,
        id: CommandId,
        command: &C,
    ) -> Result<CommandId, StoreError> {
        let row = InternalCommand::from_payload(id, command, Utc::now())
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", C::KIND)))?;
        self.stage_command(row)?;
        tracing::debug!(command_id = %id, kind = C::KIND, "command enqueued");
        Ok(id)
    }
}
