//! Postgres-backed command store and repositories.
//!
//! Commands, transactions and accounting points live in the tables created by
//! `migrations/0001_outbox.sql`; a unit of work commits all of them in one SQL
//! transaction.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `AlreadyExists` | Duplicate command or transaction id |
//! | Database (other) | Any other | `Storage` | Constraint or server errors |
//! | PoolClosed / Io / Tls / … | N/A | `Storage` | Connection failures |
//!
//! Version mismatches are detected by conditional updates (`rows_affected() == 0`)
//! and reported as `Conflict`; a processed mark whose claim token no longer
//! matches is `ClaimLost`.
//!
//! ## Sync bridge
//!
//! The store traits are synchronous. Calls run the async queries on the
//! current tokio runtime through `block_in_place`, which requires the
//! multi-thread runtime flavor.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::instrument;
use uuid::Uuid;

use marketroles_core::{AggregateRoot, CommandId, ExpectedVersion, TransactionId};
use marketroles_processes::{AccountingPoint, Transaction};

use crate::config::DatabaseConfig;
use crate::outbox::types::offset_by;
use crate::outbox::unit_of_work::{ChangeSet, StagedAccountingPoint, StagedTransaction, TransactionWrite};
use crate::outbox::{
    ClaimFilter, ClaimToken, ClaimedCommand, CommandStats, CommandStore, FailureDisposition,
    InternalCommand, RetryPolicy, StoreError, UnitOfWork,
};
use crate::repositories::{AccountingPointRepository, RepositoryError, TransactionRepository};

const SCHEMA: &str = include_str!("../migrations/0001_outbox.sql");

const COMMAND_COLUMNS: &str = "sequence, id, kind, payload, created_at, processed, processed_at, \
     attempts, last_error, not_before, dead_lettered_at";

#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: Arc<PgPool>,
}

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the outbox and snapshot tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    #[instrument(skip(self, exclude), err)]
    async fn claim_next_async(
        &self,
        exclude: Vec<Uuid>,
        up_to_sequence: Option<u64>,
        lease: std::time::Duration,
    ) -> Result<Option<ClaimedCommand>, StoreError> {
        let now = Utc::now();
        let claim = ClaimToken::new();
        let sql = format!(
            r#"
            UPDATE internal_commands
            SET claim_token = $1, claimed_until = $2
            WHERE id = (
                SELECT id FROM internal_commands
                WHERE processed = FALSE
                  AND dead_lettered_at IS NULL
                  AND (not_before IS NULL OR not_before <= $3)
                  AND (claimed_until IS NULL OR claimed_until <= $3)
                  AND NOT (id = ANY($4))
                  AND ($5::BIGINT IS NULL OR sequence <= $5)
                ORDER BY sequence, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {COMMAND_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(claim.as_uuid())
            .bind(offset_by(now, lease))
            .bind(now)
            .bind(exclude)
            .bind(up_to_sequence.map(|s| s as i64))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("claim_next", e))?;

        row.map(|row| {
            Ok(ClaimedCommand {
                command: command_from_row(&row)?,
                claim,
            })
        })
        .transpose()
    }

    #[instrument(skip(self, error, policy), fields(command_id = %id), err)]
    async fn record_failure_async(
        &self,
        id: CommandId,
        claim: ClaimToken,
        error: &str,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureDisposition, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            "SELECT attempts, claim_token FROM internal_commands WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("record_failure", e))?
        .ok_or_else(|| StoreError::NotFound(format!("command {id}")))?;

        let owner: Option<Uuid> = row.try_get("claim_token").map_err(decode_error)?;
        if owner.as_ref() != Some(claim.as_uuid()) {
            return Err(StoreError::ClaimLost(id));
        }
        let attempts = row.try_get::<i32, _>("attempts").map_err(decode_error)? as u32 + 1;

        let disposition = if policy.should_retry(attempts) {
            FailureDisposition::Retry {
                attempts,
                not_before: offset_by(now, policy.delay_for_attempt(attempts)),
            }
        } else {
            FailureDisposition::DeadLettered { attempts }
        };
        let (not_before, dead_lettered_at) = match &disposition {
            FailureDisposition::Retry { not_before, .. } => (Some(*not_before), None),
            FailureDisposition::DeadLettered { .. } => (None, Some(now)),
        };

        sqlx::query(
            r#"
            UPDATE internal_commands
            SET attempts = $2,
                last_error = $3,
                not_before = $4,
                dead_lettered_at = $5,
                claim_token = NULL,
                claimed_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(attempts as i32)
        .bind(error)
        .bind(not_before)
        .bind(dead_lettered_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("record_failure", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(disposition)
    }

    async fn get_async(&self, id: CommandId) -> Result<Option<InternalCommand>, StoreError> {
        let sql = format!("SELECT {COMMAND_COLUMNS} FROM internal_commands WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_command", e))?;
        row.as_ref().map(command_from_row).transpose()
    }

    async fn high_water_mark_async(&self) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT MAX(sequence) AS mark FROM internal_commands")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("high_water_mark", e))?;
        let mark: Option<i64> = row.try_get("mark").map_err(decode_error)?;
        Ok(mark.map(|m| m as u64))
    }

    async fn list_dead_letters_async(&self, limit: usize) -> Result<Vec<InternalCommand>, StoreError> {
        let sql = format!(
            "SELECT {COMMAND_COLUMNS} FROM internal_commands \
             WHERE dead_lettered_at IS NOT NULL ORDER BY sequence LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_dead_letters", e))?;
        rows.iter().map(command_from_row).collect()
    }

    async fn retry_dead_letter_async(&self, id: CommandId) -> Result<InternalCommand, StoreError> {
        let sql = format!(
            r#"
            UPDATE internal_commands
            SET dead_lettered_at = NULL,
                attempts = 0,
                not_before = NULL,
                claim_token = NULL,
                claimed_until = NULL
            WHERE id = $1 AND dead_lettered_at IS NOT NULL
            RETURNING {COMMAND_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("retry_dead_letter", e))?;

        match row {
            Some(row) => command_from_row(&row),
            None => match self.get_async(id).await? {
                Some(_) => Err(StoreError::Conflict(format!("command {id} is not dead-lettered"))),
                None => Err(StoreError::NotFound(format!("command {id}"))),
            },
        }
    }

    async fn stats_async(&self) -> Result<CommandStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE processed) AS processed,
                COUNT(*) FILTER (WHERE NOT processed AND dead_lettered_at IS NOT NULL) AS dead_lettered,
                COUNT(*) FILTER (WHERE NOT processed AND dead_lettered_at IS NULL) AS pending,
                COUNT(*) FILTER (
                    WHERE NOT processed AND dead_lettered_at IS NULL AND claimed_until > $1
                ) AS in_flight,
                COUNT(*) FILTER (
                    WHERE NOT processed AND dead_lettered_at IS NULL AND attempts > 0
                ) AS failing
            FROM internal_commands
            "#,
        )
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("stats", e))?;

        let count = |column: &str| -> Result<usize, StoreError> {
            let n: i64 = row.try_get(column).map_err(decode_error)?;
            Ok(n as usize)
        };
        Ok(CommandStats {
            pending: count("pending")?,
            in_flight: count("in_flight")?,
            failing: count("failing")?,
            processed: count("processed")?,
            dead_lettered: count("dead_lettered")?,
        })
    }

    async fn load_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query("SELECT version, snapshot FROM transactions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| repository_error(map_sqlx_error("load_transaction", e)))?;
        row.map(|row| {
            let snapshot = SnapshotRow::from_row(&row).map_err(|e| repository_error(decode_error(e)))?;
            let transaction: Transaction = serde_json::from_value(snapshot.snapshot)
                .map_err(|e| RepositoryError::Serialization(format!("transaction {id}: {e}")))?;
            Ok(transaction.with_version(snapshot.version as u64))
        })
        .transpose()
    }

    async fn transaction_version(&self, id: &TransactionId) -> Result<Option<u64>, RepositoryError> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM transactions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| repository_error(map_sqlx_error("transaction_version", e)))?;
        Ok(version.map(|v| v as u64))
    }

    async fn load_accounting_point(&self, gsrn: &str) -> Result<Option<AccountingPoint>, RepositoryError> {
        let row = sqlx::query("SELECT version, snapshot FROM accounting_points WHERE gsrn = $1")
            .bind(gsrn)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| repository_error(map_sqlx_error("load_accounting_point", e)))?;
        row.map(|row| {
            let snapshot = SnapshotRow::from_row(&row).map_err(|e| repository_error(decode_error(e)))?;
            let point: AccountingPoint = serde_json::from_value(snapshot.snapshot)
                .map_err(|e| RepositoryError::Serialization(format!("accounting point {gsrn}: {e}")))?;
            Ok(point.with_version(snapshot.version as u64))
        })
        .transpose()
    }

    #[instrument(
        skip(self, changes),
        fields(
            commands = changes.commands.len(),
            processed = changes.processed.len(),
            transactions = changes.transactions.len(),
            accounting_points = changes.accounting_points.len()
        ),
        err
    )]
    async fn commit_changes(&self, changes: ChangeSet) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for command in &changes.commands {
            insert_command(&mut tx, command).await?;
        }

        for (id, claim) in &changes.processed {
            let result = sqlx::query(
                r#"
                UPDATE internal_commands
                SET processed = TRUE, processed_at = $3, claim_token = NULL, claimed_until = NULL
                WHERE id = $1 AND claim_token = $2 AND processed = FALSE
                "#,
            )
            .bind(id.as_uuid())
            .bind(claim.as_uuid())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("mark_processed", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::ClaimLost(*id));
            }
        }

        for staged in &changes.transactions {
            write_transaction(&mut tx, staged).await?;
        }

        for staged in &changes.accounting_points {
            write_accounting_point(&mut tx, staged).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

async fn insert_command(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    command: &InternalCommand,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO internal_commands (
            id, kind, payload, created_at, processed, processed_at,
            attempts, last_error, not_before, dead_lettered_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(command.id.as_uuid())
    .bind(&command.kind)
    .bind(&command.payload)
    .bind(command.created_at)
    .bind(command.processed)
    .bind(command.processed_at)
    .bind(command.attempts as i32)
    .bind(&command.last_error)
    .bind(command.not_before)
    .bind(command.dead_lettered_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::AlreadyExists(format!("command {}", command.id))
        } else {
            map_sqlx_error("insert_command", e)
        }
    })?;
    Ok(())
}

async fn write_transaction(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    staged: &StagedTransaction,
) -> Result<(), StoreError> {
    let transaction = &staged.transaction;
    let id = transaction.id();
    let snapshot = serde_json::to_value(transaction)
        .map_err(|e| StoreError::Serialization(format!("transaction {id}: {e}")))?;

    match staged.write {
        TransactionWrite::Insert => {
            sqlx::query("INSERT INTO transactions (id, version, snapshot) VALUES ($1, 1, $2)")
                .bind(id.as_str())
                .bind(&snapshot)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::AlreadyExists(format!("transaction {id}"))
                    } else {
                        map_sqlx_error("insert_transaction", e)
                    }
                })?;
        }
        TransactionWrite::Update(expected) => {
            let result = sqlx::query(
                r#"
                UPDATE transactions
                SET version = version + 1, snapshot = $2
                WHERE id = $1 AND ($3::BIGINT IS NULL OR version = $3)
                "#,
            )
            .bind(id.as_str())
            .bind(&snapshot)
            .bind(exact_version(expected))
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_transaction", e))?;

            if result.rows_affected() == 0 {
                let exists: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM transactions WHERE id = $1")
                        .bind(id.as_str())
                        .fetch_optional(&mut **tx)
                        .await
                        .map_err(|e| map_sqlx_error("update_transaction", e))?;
                return Err(match exists {
                    Some(actual) => StoreError::Conflict(format!(
                        "transaction {id}: expected {expected:?}, found {actual}"
                    )),
                    None => StoreError::NotFound(format!("transaction {id}")),
                });
            }
        }
    }
    Ok(())
}

async fn write_accounting_point(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    staged: &StagedAccountingPoint,
) -> Result<(), StoreError> {
    let gsrn = staged.point.gsrn();
    let snapshot = serde_json::to_value(&staged.point)
        .map_err(|e| StoreError::Serialization(format!("accounting point {gsrn}: {e}")))?;

    let result = match staged.expected {
        ExpectedVersion::Exact(0) => {
            sqlx::query(
                "INSERT INTO accounting_points (gsrn, version, snapshot) VALUES ($1, 1, $2) \
                 ON CONFLICT (gsrn) DO NOTHING",
            )
            .bind(gsrn.as_str())
            .bind(&snapshot)
            .execute(&mut **tx)
            .await
        }
        ExpectedVersion::Exact(version) => {
            sqlx::query(
                "UPDATE accounting_points SET version = version + 1, snapshot = $2 \
                 WHERE gsrn = $1 AND version = $3",
            )
            .bind(gsrn.as_str())
            .bind(&snapshot)
            .bind(version as i64)
            .execute(&mut **tx)
            .await
        }
        ExpectedVersion::Any => {
            sqlx::query(
                "INSERT INTO accounting_points (gsrn, version, snapshot) VALUES ($1, 1, $2) \
                 ON CONFLICT (gsrn) DO UPDATE \
                 SET version = accounting_points.version + 1, snapshot = EXCLUDED.snapshot",
            )
            .bind(gsrn.as_str())
            .bind(&snapshot)
            .execute(&mut **tx)
            .await
        }
    }
    .map_err(|e| map_sqlx_error("write_accounting_point", e))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!(
            "accounting point {gsrn}: expected {:?}",
            staged.expected
        )));
    }
    Ok(())
}

fn exact_version(expected: ExpectedVersion) -> Option<i64> {
    match expected {
        ExpectedVersion::Any => None,
        ExpectedVersion::Exact(v) => Some(v as i64),
    }
}

/// Run an async store call from sync code on the current tokio runtime.
fn block_on<F, T, E>(fut: F, storage: fn(String) -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let handle = Handle::try_current().map_err(|_| {
        storage("PostgresDatabase requires a tokio runtime; call it from within one".to_string())
    })?;
    if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
        return Err(storage(
            "PostgresDatabase requires the multi-thread tokio runtime".to_string(),
        ));
    }
    tokio::task::block_in_place(|| handle.block_on(fut))
}

impl CommandStore for PostgresDatabase {
    fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(PostgresUnitOfWork {
            db: self.clone(),
            changes: ChangeSet::default(),
        }))
    }

    fn claim_next(&self, filter: &ClaimFilter<'_>) -> Result<Option<ClaimedCommand>, StoreError> {
        let exclude: Vec<Uuid> = filter.exclude.iter().map(|id| *id.as_uuid()).collect();
        block_on(
            self.claim_next_async(exclude, filter.up_to_sequence, filter.lease),
            StoreError::Storage,
        )
    }

    fn record_failure(
        &self,
        id: CommandId,
        claim: ClaimToken,
        error: &str,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureDisposition, StoreError> {
        block_on(
            self.record_failure_async(id, claim, error, policy, now),
            StoreError::Storage,
        )
    }

    fn get(&self, id: CommandId) -> Result<Option<InternalCommand>, StoreError> {
        block_on(self.get_async(id), StoreError::Storage)
    }

    fn high_water_mark(&self) -> Result<Option<u64>, StoreError> {
        block_on(self.high_water_mark_async(), StoreError::Storage)
    }

    fn list_dead_letters(&self, limit: usize) -> Result<Vec<InternalCommand>, StoreError> {
        block_on(self.list_dead_letters_async(limit), StoreError::Storage)
    }

    fn retry_dead_letter(&self, id: CommandId) -> Result<InternalCommand, StoreError> {
        block_on(self.retry_dead_letter_async(id), StoreError::Storage)
    }

    fn stats(&self) -> Result<CommandStats, StoreError> {
        block_on(self.stats_async(), StoreError::Storage)
    }
}

/// Unit of work over a [`PostgresDatabase`].
///
/// Staged writes are buffered in memory and written in one SQL transaction at
/// `commit`; reads go to the pool and see only committed rows plus this
/// unit's own staged writes.
pub struct PostgresUnitOfWork {
    db: PostgresDatabase,
    changes: ChangeSet,
}

impl UnitOfWork for PostgresUnitOfWork {
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
        block_on(db.commit_changes(changes), StoreError::Storage)
    }
}

impl TransactionRepository for PostgresUnitOfWork {
    fn add(&mut self, transaction: Transaction) -> Result<(), RepositoryError> {
        let db = &self.db;
        let id = transaction.id().clone();
        self.changes.add_transaction(transaction, || {
            let version = block_on(db.transaction_version(&id), RepositoryError::Storage)?;
            Ok(version.is_some())
        })
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, RepositoryError> {
        if let Some(staged) = self.changes.staged_transaction(id) {
            return Ok(staged.clone());
        }
        block_on(self.db.load_transaction(id), RepositoryError::Storage)?
            .ok_or_else(|| RepositoryError::NotFound(format!("transaction {id}")))
    }

    fn save(&mut self, transaction: Transaction, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let db = &self.db;
        let id = transaction.id().clone();
        self.changes.save_transaction(transaction, expected, || {
            block_on(db.transaction_version(&id), RepositoryError::Storage)
        })
    }
}

impl AccountingPointRepository for PostgresUnitOfWork {
    fn find(&self, gsrn: &str) -> Result<Option<AccountingPoint>, RepositoryError> {
        if let Some(staged) = self.changes.staged_point(gsrn) {
            return Ok(Some(staged.clone()));
        }
        block_on(self.db.load_accounting_point(gsrn), RepositoryError::Storage)
    }

    fn save(&mut self, point: AccountingPoint, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let db = &self.db;
        let gsrn = point.gsrn().as_str().to_string();
        self.changes.save_point(point, expected, || {
            let current = block_on(db.load_accounting_point(&gsrn), RepositoryError::Storage)?;
            Ok(current.map(|p| p.version()))
        })
    }
}

// SQLx row types

#[derive(Debug)]
struct CommandRow {
    sequence: i64,
    id: Uuid,
    kind: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    attempts: i32,
    last_error: Option<String>,
    not_before: Option<DateTime<Utc>>,
    dead_lettered_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for CommandRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CommandRow {
            sequence: row.try_get("sequence")?,
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            processed: row.try_get("processed")?,
            processed_at: row.try_get("processed_at")?,
            attempts: row.try_get("attempts")?,
            last_error: row.try_get("last_error")?,
            not_before: row.try_get("not_before")?,
            dead_lettered_at: row.try_get("dead_lettered_at")?,
        })
    }
}

impl From<CommandRow> for InternalCommand {
    fn from(row: CommandRow) -> Self {
        InternalCommand {
            id: CommandId::from_uuid(row.id),
            kind: row.kind,
            payload: row.payload,
            created_at: row.created_at,
            processed: row.processed,
            processed_at: row.processed_at,
            sequence: Some(row.sequence as u64),
            attempts: row.attempts as u32,
            last_error: row.last_error,
            not_before: row.not_before,
            dead_lettered_at: row.dead_lettered_at,
        }
    }
}

#[derive(Debug)]
struct SnapshotRow {
    version: i64,
    snapshot: serde_json::Value,
}

impl<'r> FromRow<'r, PgRow> for SnapshotRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SnapshotRow {
            version: row.try_get("version")?,
            snapshot: row.try_get("snapshot")?,
        })
    }
}

fn command_from_row(row: &PgRow) -> Result<InternalCommand, StoreError> {
    CommandRow::from_row(row)
        .map(InternalCommand::from)
        .map_err(decode_error)
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Storage(format!("failed to decode row: {err}"))
}

fn repository_error(err: StoreError) -> RepositoryError {
    match err {
        StoreError::NotFound(msg) => RepositoryError::NotFound(msg),
        StoreError::AlreadyExists(msg) => RepositoryError::AlreadyExists(msg),
        StoreError::Conflict(msg) => RepositoryError::Conflict(msg),
        StoreError::Serialization(msg) => RepositoryError::Serialization(msg),
        other => RepositoryError::Storage(other.to_string()),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::AlreadyExists(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Storage(format!("connection pool closed in {operation}")),
        other => StoreError::Storage(format!("{operation} failed: {other}")),
    }
}
