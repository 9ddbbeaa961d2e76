//! Repositories for snapshot-persisted aggregates.
//!
//! Repositories are reached through a `UnitOfWork`: reads see the committed
//! state overlaid with the unit's own staged writes, and writes only become
//! visible when the unit commits.

use marketroles_core::{ExpectedVersion, TransactionId};
use marketroles_processes::{AccountingPoint, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("concurrency conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Business transactions and their outbound messages.
///
/// At most one transaction exists per id; `add` is the exactly-once gate for
/// forwarding.
pub trait TransactionRepository {
    /// Register a new transaction. Fails with `AlreadyExists` when the id is
    /// committed or already staged in this unit of work.
    fn add(&mut self, transaction: Transaction) -> Result<(), RepositoryError>;

    /// Load a transaction; a missing id is `NotFound`, never an empty aggregate.
    fn get(&self, id: &TransactionId) -> Result<Transaction, RepositoryError>;

    /// Write back a loaded transaction, guarded by `expected`.
    fn save(&mut self, transaction: Transaction, expected: ExpectedVersion)
    -> Result<(), RepositoryError>;
}

pub trait AccountingPointRepository {
    /// Look up by GSRN. Malformed ids simply do not exist.
    fn find(&self, gsrn: &str) -> Result<Option<AccountingPoint>, RepositoryError>;

    /// Insert or update, guarded by `expected` (an absent point is version 0).
    fn save(&mut self, point: AccountingPoint, expected: ExpectedVersion)
    -> Result<(), RepositoryError>;
}
