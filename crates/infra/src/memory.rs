//! In-memory backend for tests/dev.
//!
//! All tables live behind a single `RwLock`, so a commit holds the write lock
//! while it first validates every staged write and then applies them. Nothing
//! is applied when validation fails.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use marketroles_core::{AggregateRoot, CommandId, ExpectedVersion, TransactionId};
use marketroles_processes::{AccountingPoint, Transaction};

use crate::outbox::types::offset_by;
use crate::outbox::unit_of_work::{ChangeSet, TransactionWrite};
use crate::outbox::{
    ClaimFilter, ClaimToken, ClaimedCommand, CommandStats, CommandStore, FailureDisposition,
    InternalCommand, RetryPolicy, StoreError, UnitOfWork,
};
use crate::repositories::{AccountingPointRepository, RepositoryError, TransactionRepository};

#[derive(Debug, Clone)]
struct CommandRow {
    command: InternalCommand,
    /// Current owner and lease expiry.
    claim: Option<(ClaimToken, DateTime<Utc>)>,
}

impl CommandRow {
    fn is_claimed(&self, now: DateTime<Utc>) -> bool {
        self.claim.is_some_and(|(_, until)| until > now)
    }
}

#[derive(Debug, Default)]
struct Tables {
    commands: HashMap<CommandId, CommandRow>,
    next_sequence: u64,
    transactions: HashMap<TransactionId, Transaction>,
    accounting_points: HashMap<String, AccountingPoint>,
}

struct Poisoned;

impl From<Poisoned> for StoreError {
    fn from(_: Poisoned) -> Self {
        StoreError::Storage("in-memory database lock poisoned".to_string())
    }
}

impl From<Poisoned> for RepositoryError {
    fn from(_: Poisoned) -> Self {
        RepositoryError::Storage("in-memory database lock poisoned".to_string())
    }
}

/// Command store plus repository tables, shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, Poisoned> {
        self.tables.read().map_err(|_| Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, Poisoned> {
        self.tables.write().map_err(|_| Poisoned)
    }

    /// Every command row in `sequence` order.
    pub fn all_commands(&self) -> Result<Vec<InternalCommand>, StoreError> {
        let tables = self.read()?;
        let mut commands: Vec<InternalCommand> =
            tables.commands.values().map(|row| row.command.clone()).collect();
        commands.sort_by_key(|c| (c.sequence, c.id));
        Ok(commands)
    }

    pub fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.read()?.transactions.get(id).cloned())
    }

    pub fn accounting_point(&self, gsrn: &str) -> Result<Option<AccountingPoint>, RepositoryError> {
        Ok(self.read()?.accounting_points.get(gsrn).cloned())
    }
}

impl CommandStore for InMemoryDatabase {
    fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(InMemoryUnitOfWork {
            db: self.clone(),
            changes: ChangeSet::default(),
        }))
    }

    fn claim_next(&self, filter: &ClaimFilter<'_>) -> Result<Option<ClaimedCommand>, StoreError> {
        let now = Utc::now();
        let mut tables = self.write()?;

        let next = tables
            .commands
            .values()
            .filter(|row| row.command.is_ready(now) && !row.is_claimed(now))
            .filter(|row| !filter.exclude.contains(&row.command.id))
            .filter(|row| match (filter.up_to_sequence, row.command.sequence) {
                (Some(ceiling), Some(sequence)) => sequence <= ceiling,
                _ => true,
            })
            .min_by_key(|row| (row.command.sequence, row.command.id))
            .map(|row| row.command.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(row) = tables.commands.get_mut(&id) else {
            return Ok(None);
        };

        let claim = ClaimToken::new();
        row.claim = Some((claim, offset_by(now, filter.lease)));
        Ok(Some(ClaimedCommand {
            command: row.command.clone(),
            claim,
        }))
    }

    fn record_failure(
        &self,
        id: CommandId,
        claim: ClaimToken,
        error: &str,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureDisposition, StoreError> {
        let mut tables = self.write()?;
        let row = tables
            .commands
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("command {id}")))?;

        if row.claim.map(|(token, _)| token) != Some(claim) {
            return Err(StoreError::ClaimLost(id));
        }

        let command = &mut row.command;
        command.attempts += 1;
        command.last_error = Some(error.to_string());
        row.claim = None;

        if policy.should_retry(command.attempts) {
            let not_before = offset_by(now, policy.delay_for_attempt(command.attempts));
            command.not_before = Some(not_before);
            Ok(FailureDisposition::Retry {
                attempts: command.attempts,
                not_before,
            })
        } else {
            command.dead_lettered_at = Some(now);
            Ok(FailureDisposition::DeadLettered {
                attempts: command.attempts,
            })
        }
    }

    fn get(&self, id: CommandId) -> Result<Option<InternalCommand>, StoreError> {
        Ok(self.read()?.commands.get(&id).map(|row| row.command.clone()))
    }

    fn high_water_mark(&self) -> Result<Option<u64>, StoreError> {
        Ok(self
            .read()?
            .commands
            .values()
            .filter_map(|row| row.command.sequence)
            .max())
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<InternalCommand>, StoreError> {
        let tables = self.read()?;
        let mut dead: Vec<InternalCommand> = tables
            .commands
            .values()
            .filter(|row| row.command.is_dead_lettered())
            .map(|row| row.command.clone())
            .collect();
        dead.sort_by_key(|c| (c.sequence, c.id));
        dead.truncate(limit);
        Ok(dead)
    }

    fn retry_dead_letter(&self, id: CommandId) -> Result<InternalCommand, StoreError> {
        let mut tables = self.write()?;
        let row = tables
            .commands
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("command {id}")))?;

        if !row.command.is_dead_lettered() {
            return Err(StoreError::Conflict(format!("command {id} is not dead-lettered")));
        }

        row.command.dead_lettered_at = None;
        row.command.attempts = 0;
        row.command.not_before = None;
        row.claim = None;
        Ok(row.command.clone())
    }

    fn stats(&self) -> Result<CommandStats, StoreError> {
        let now = Utc::now();
        let tables = self.read()?;
        let mut stats = CommandStats::default();

        for row in tables.commands.values() {
            let command = &row.command;
            if command.processed {
                stats.processed += 1;
            } else if command.is_dead_lettered() {
                stats.dead_lettered += 1;
            } else {
                stats.pending += 1;
                if row.is_claimed(now) {
                    stats.in_flight += 1;
                }
                if command.attempts > 0 {
                    stats.failing += 1;
                }
            }
        }
        Ok(stats)
    }
}

/// Unit of work over an [`InMemoryDatabase`].
///
/// Reads see committed rows overlaid with this unit's staged writes.
pub struct InMemoryUnitOfWork {
    db: InMemoryDatabase,
    changes: ChangeSet,
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn stage_command(&mut self, command: InternalCommand) -> Result<(), StoreError> {
        self.changes.stage_command(command)
    }

    fn mark_processed(&mut self, id: CommandId, claim: ClaimToken) -> Result<(), StoreError> {
        self.changes.mark_processed(id, claim);
        Ok(())
    }

    fn transactions(&mut self) -> &mut dyn TransactionRepository {
        self
    }

    fn accounting_points(&mut self) -> &mut dyn AccountingPointRepository {
        self
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { db, changes } = *self;
        if changes.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut tables = db.write()?;
        validate(&tables, &changes)?;

        for mut command in changes.commands {
            tables.next_sequence += 1;
            command.sequence = Some(tables.next_sequence);
            tables.commands.insert(command.id, CommandRow { command, claim: None });
        }

        for (id, _) in changes.processed {
            if let Some(row) = tables.commands.get_mut(&id) {
                row.command.processed = true;
                row.command.processed_at = Some(now);
                row.claim = None;
            }
        }

        for staged in changes.transactions {
            let id = staged.transaction.id().clone();
            let version = tables.transactions.get(&id).map_or(0, |t| t.version()) + 1;
            tables
                .transactions
                .insert(id, staged.transaction.with_version(version));
        }

        for staged in changes.accounting_points {
            let gsrn = staged.point.gsrn().as_str().to_string();
            let version = tables.accounting_points.get(&gsrn).map_or(0, |p| p.version()) + 1;
            tables
                .accounting_points
                .insert(gsrn, staged.point.with_version(version));
        }

        Ok(())
    }
}

fn validate(tables: &Tables, changes: &ChangeSet) -> Result<(), StoreError> {
    for command in &changes.commands {
        if tables.commands.contains_key(&command.id) {
            return Err(StoreError::AlreadyExists(format!("command {}", command.id)));
        }
    }

    for (id, claim) in &changes.processed {
        let row = tables
            .commands
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("command {id}")))?;
        if row.command.processed || row.claim.map(|(token, _)| token) != Some(*claim) {
            return Err(StoreError::ClaimLost(*id));
        }
    }

    for staged in &changes.transactions {
        let id = staged.transaction.id();
        let current = tables.transactions.get(id);
        match (&staged.write, current) {
            (TransactionWrite::Insert, Some(_)) => {
                return Err(StoreError::AlreadyExists(format!("transaction {id}")));
            }
            (TransactionWrite::Insert, None) => {}
            (TransactionWrite::Update(_), None) => {
                return Err(StoreError::NotFound(format!("transaction {id}")));
            }
            (TransactionWrite::Update(expected), Some(current)) => {
                check_version(*expected, current.version(), || format!("transaction {id}"))?;
            }
        }
    }

    for staged in &changes.accounting_points {
        let gsrn = staged.point.gsrn();
        let current = tables
            .accounting_points
            .get(gsrn.as_str())
            .map_or(0, |p| p.version());
        check_version(staged.expected, current, || format!("accounting point {gsrn}"))?;
    }

    Ok(())
}

fn check_version(
    expected: ExpectedVersion,
    actual: u64,
    what: impl FnOnce() -> String,
) -> Result<(), StoreError> {
    expected
        .check(actual)
        .map_err(|e| StoreError::Conflict(format!("{}: {e}", what())))
}

impl TransactionRepository for InMemoryUnitOfWork {
    fn add(&mut self, transaction: Transaction) -> Result<(), RepositoryError> {
        let db = &self.db;
        let id = transaction.id().clone();
        self.changes.add_transaction(transaction, || {
            Ok(db.read()?.transactions.contains_key(&id))
        })
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, RepositoryError> {
        if let Some(staged) = self.changes.staged_transaction(id) {
            return Ok(staged.clone());
        }
        self.db
            .transaction(id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("transaction {id}")))
    }

    fn save(&mut self, transaction: Transaction, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let db = &self.db;
        let id = transaction.id().clone();
        self.changes.save_transaction(transaction, expected, || {
            Ok(db.read()?.transactions.get(&id).map(|t| t.version()))
        })
    }
}

impl AccountingPointRepository for InMemoryUnitOfWork {
    fn find(&self, gsrn: &str) -> Result<Option<AccountingPoint>, RepositoryError> {
        if let Some(staged) = self.changes.staged_point(gsrn) {
            return Ok(Some(staged.clone()));
        }
        self.db.accounting_point(gsrn)
    }

    fn save(&mut self, point: AccountingPoint, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let db = &self.db;
        let gsrn = point.gsrn().as_str().to_string();
        self.changes.save_point(point, expected, || {
            Ok(db.read()?.accounting_points.get(&gsrn).map(|p| p.version()))
        })
    }
}
