//! Unit of work: the atomic boundary shared by state changes and enqueued
//! commands.

use marketroles_core::{AggregateRoot, CommandId, ExpectedVersion, TransactionId};
use marketroles_processes::{AccountingPoint, Transaction};

use crate::repositories::{AccountingPointRepository, RepositoryError, TransactionRepository};

use super::store::StoreError;
use super::types::{ClaimToken, InternalCommand};

/// Staged writes committed together or not at all.
///
/// Dropping a unit of work without calling `commit` discards everything it
/// staged.
pub trait UnitOfWork: Send {
    /// Stage a new outbox row.
    fn stage_command(&mut self, command: InternalCommand) -> Result<(), StoreError>;

    /// Stage marking a claimed command processed. The commit fails with
    /// `ClaimLost` unless `claim` still owns the command.
    fn mark_processed(&mut self, id: CommandId, claim: ClaimToken) -> Result<(), StoreError>;

    fn transactions(&mut self) -> &mut dyn TransactionRepository;

    fn accounting_points(&mut self) -> &mut dyn AccountingPointRepository;

    /// Apply everything staged as one atomic unit.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub(crate) enum TransactionWrite {
    Insert,
    Update(ExpectedVersion),
}

#[derive(Debug)]
pub(crate) struct StagedTransaction {
    pub(crate) transaction: Transaction,
    pub(crate) write: TransactionWrite,
}

#[derive(Debug)]
pub(crate) struct StagedAccountingPoint {
    pub(crate) point: AccountingPoint,
    pub(crate) expected: ExpectedVersion,
}

/// Backend-independent staging area behind every unit of work.
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    pub(crate) commands: Vec<InternalCommand>,
    pub(crate) processed: Vec<(CommandId, ClaimToken)>,
    pub(crate) transactions: Vec<StagedTransaction>,
    pub(crate) accounting_points: Vec<StagedAccountingPoint>,
}

impl ChangeSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.commands.is_empty()
            && self.processed.is_empty()
            && self.transactions.is_empty()
            && self.accounting_points.is_empty()
    }

    pub(crate) fn stage_command(&mut self, command: InternalCommand) -> Result<(), StoreError> {
        if self.commands.iter().any(|c| c.id == command.id) {
            return Err(StoreError::AlreadyExists(format!("command {}", command.id)));
        }
        self.commands.push(command);
        Ok(())
    }

    pub(crate) fn mark_processed(&mut self, id: CommandId, claim: ClaimToken) {
        if !self.processed.iter().any(|(staged, _)| *staged == id) {
            self.processed.push((id, claim));
        }
    }

    pub(crate) fn staged_transaction(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|s| s.transaction.id() == id)
            .map(|s| &s.transaction)
    }

    pub(crate) fn add_transaction(
        &mut self,
        transaction: Transaction,
        committed: impl FnOnce() -> Result<bool, RepositoryError>,
    ) -> Result<(), RepositoryError> {
        let id = transaction.id().clone();
        if self.staged_transaction(&id).is_some() || committed()? {
            return Err(RepositoryError::AlreadyExists(format!("transaction {id}")));
        }
        self.transactions.push(StagedTransaction {
            transaction: transaction.with_version(0),
            write: TransactionWrite::Insert,
        });
        Ok(())
    }

    /// `committed_version` is only consulted when nothing is staged for the id.
    pub(crate) fn save_transaction(
        &mut self,
        transaction: Transaction,
        expected: ExpectedVersion,
        committed_version: impl FnOnce() -> Result<Option<u64>, RepositoryError>,
    ) -> Result<(), RepositoryError> {
        let id = transaction.id().clone();
        if let Some(staged) = self
            .transactions
            .iter_mut()
            .find(|s| s.transaction.id() == &id)
        {
            check(expected, staged.transaction.version(), || format!("transaction {id}"))?;
            staged.transaction = transaction;
            return Ok(());
        }

        let current = committed_version()?
            .ok_or_else(|| RepositoryError::NotFound(format!("transaction {id}")))?;
        check(expected, current, || format!("transaction {id}"))?;
        self.transactions.push(StagedTransaction {
            transaction,
            write: TransactionWrite::Update(expected),
        });
        Ok(())
    }

    pub(crate) fn staged_point(&self, gsrn: &str) -> Option<&AccountingPoint> {
        self.accounting_points
            .iter()
            .find(|s| s.point.gsrn().as_str() == gsrn)
            .map(|s| &s.point)
    }

    pub(crate) fn save_point(
        &mut self,
        point: AccountingPoint,
        expected: ExpectedVersion,
        committed_version: impl FnOnce() -> Result<Option<u64>, RepositoryError>,
    ) -> Result<(), RepositoryError> {
        let gsrn = point.gsrn().clone();
        if let Some(staged) = self
            .accounting_points
            .iter_mut()
            .find(|s| s.point.gsrn() == &gsrn)
        {
            check(expected, staged.point.version(), || format!("accounting point {gsrn}"))?;
            staged.point = point;
            return Ok(());
        }

        let current = committed_version()?.unwrap_or(0);
        check(expected, current, || format!("accounting point {gsrn}"))?;
        self.accounting_points
            .push(StagedAccountingPoint { point, expected });
        Ok(())
    }
}

fn check(
    expected: ExpectedVersion,
    actual: u64,
    what: impl FnOnce() -> String,
) -> Result<(), RepositoryError> {
    expected
        .check(actual)
        .map_err(|e| RepositoryError::Conflict(format!("{}: {e}", what())))
}
