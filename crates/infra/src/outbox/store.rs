//! Command store (outbox) boundary.

use chrono::{DateTime, Utc};

use marketroles_core::CommandId;

use super::types::{
    ClaimFilter, ClaimToken, ClaimedCommand, CommandStats, FailureDisposition, InternalCommand,
    RetryPolicy,
};
use super::unit_of_work::UnitOfWork;

/// Command store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic concurrency or state conflict detected at commit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The claim on a command was taken over by someone else.
    #[error("claim on command {0} was lost")]
    ClaimLost(CommandId),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Errors that concern one command only; anything else means the store
    /// itself is unusable.
    pub fn is_command_local(&self) -> bool {
        !matches!(self, StoreError::Storage(_))
    }
}

/// Durable, ordered queue of internal commands plus the unit-of-work factory
/// that writes to it.
///
/// Implementations must make `claim_next` atomic: two concurrent callers never
/// receive the same command while its lease is live.
pub trait CommandStore: Send + Sync {
    /// Start a unit of work. Nothing it stages is visible before `commit`.
    fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Claim the oldest dispatchable command (by `sequence`, then `id`).
    fn claim_next(&self, filter: &ClaimFilter<'_>) -> Result<Option<ClaimedCommand>, StoreError>;

    /// Record a failed attempt: bump `attempts`, apply backoff, release the
    /// claim, and dead-letter once `policy` is exhausted.
    fn record_failure(
        &self,
        id: CommandId,
        claim: ClaimToken,
        error: &str,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureDisposition, StoreError>;

    fn get(&self, id: CommandId) -> Result<Option<InternalCommand>, StoreError>;

    /// Highest committed `sequence`, if any command exists.
    fn high_water_mark(&self) -> Result<Option<u64>, StoreError>;

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<InternalCommand>, StoreError>;

    /// Move a dead-lettered command back into the queue with a fresh attempt budget.
    fn retry_dead_letter(&self, id: CommandId) -> Result<InternalCommand, StoreError>;

    fn stats(&self) -> Result<CommandStats, StoreError>;
}

impl<S: CommandStore + ?Sized> CommandStore for std::sync::Arc<S> {
    fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        (**self).begin()
    }

    fn claim_next(&self, filter: &ClaimFilter<'_>) -> Result<Option<ClaimedCommand>, StoreError> {
        (**self).claim_next(filter)
    }

    fn record_failure(
        &self,
        id: CommandId,
        claim: ClaimToken,
        error: &str,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureDisposition, StoreError> {
        (**self).record_failure(id, claim, error, policy, now)
    }

    fn get(&self, id: CommandId) -> Result<Option<InternalCommand>, StoreError> {
        (**self).get(id)
    }

    fn high_water_mark(&self) -> Result<Option<u64>, StoreError> {
        (**self).high_water_mark()
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<InternalCommand>, StoreError> {
        (**self).list_dead_letters(limit)
    }

    fn retry_dead_letter(&self, id: CommandId) -> Result<InternalCommand, StoreError> {
        (**self).retry_dead_letter(id)
    }

    fn stats(&self) -> Result<CommandStats, StoreError> {
        (**self).stats()
    }
}
