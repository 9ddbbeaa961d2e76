//! Outbox drain loop.
//!
//! ```text
//! drain()
//!   ceiling = high_water_mark()            (SnapshotAtStart only)
//!   loop:
//!     claim_next(exclude visited, ≤ ceiling) ── none ──▶ done
//!     begin → dispatch(kind, payload) → mark_processed → commit
//!       ok                → processed
//!       command-local err → record_failure (backoff / dead-letter), continue
//!       storage err       → abort drain
//! ```
//!
//! The loop is iterative: a handler that enqueues follow-up commands only
//! adds rows to the store, which the same loop picks up on a later
//! iteration (or a later drain, under `SnapshotAtStart`).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use marketroles_core::CommandId;

use crate::config::ProcessorConfig;
use crate::repositories::RepositoryError;

use super::router::{CommandOutcome, CommandRouter, DispatchError, HandlerContext, HandlerError};
use super::store::{CommandStore, StoreError};
use super::types::{ClaimFilter, ClaimToken, ClaimedCommand, DrainPolicy, FailureDisposition, InternalCommand};

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The store itself failed; the drain was aborted.
    #[error("command store failure: {0}")]
    Store(#[from] StoreError),
}

/// One failed dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFailure {
    pub command_id: CommandId,
    pub kind: String,
    /// Attempt number this failure counts as (1-indexed).
    pub attempt: u32,
    pub error: String,
    pub dead_lettered: bool,
}

/// What a single `drain` did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Commands marked processed (completed + rejected).
    pub processed: usize,
    pub completed: usize,
    /// Commands whose business rules rejected the request.
    pub rejected: usize,
    pub failures: Vec<CommandFailure>,
    pub dead_lettered: usize,
    /// The drain stopped at `max_commands_per_drain`; more work may be waiting.
    pub truncated: bool,
}

impl DrainReport {
    /// Commands dispatched during the drain, successful or not.
    pub fn attempted(&self) -> usize {
        self.processed + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drains the outbox, dispatching every ready command to its handler.
pub struct CommandProcessor<S: CommandStore> {
    store: S,
    router: CommandRouter,
    config: ProcessorConfig,
}

impl<S: CommandStore> CommandProcessor<S> {
    pub fn new(store: S, router: CommandRouter, config: ProcessorConfig) -> Self {
        Self {
            store,
            router,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Dispatch ready commands until none is left (or the safety bound is hit).
    ///
    /// Every command is dispatched at most once per drain. Only storage
    /// failures are returned as errors; everything that concerns a single
    /// command ends up in `DrainReport::failures`.
    pub fn drain(&self) -> Result<DrainReport, ProcessorError> {
        let ceiling = match self.config.drain_policy {
            DrainPolicy::IncludeNewlyEnqueued => None,
            DrainPolicy::SnapshotAtStart => match self.store.high_water_mark()? {
                Some(mark) => Some(mark),
                None => return Ok(DrainReport::default()),
            },
        };

        info!(
            processor = %self.config.name,
            policy = ?self.config.drain_policy,
            ceiling = ?ceiling,
            "drain started"
        );

        let mut report = DrainReport::default();
        let mut visited: HashSet<CommandId> = HashSet::new();

        loop {
            if report.attempted() >= self.config.max_commands_per_drain {
                report.truncated = true;
                warn!(
                    processor = %self.config.name,
                    limit = self.config.max_commands_per_drain,
                    "drain stopped at max commands per drain"
                );
                break;
            }

            let filter = ClaimFilter {
                exclude: &visited,
                up_to_sequence: ceiling,
                lease: self.config.claim_lease,
            };
            let Some(claimed) = self.store.claim_next(&filter).inspect_err(|e| {
                error!(processor = %self.config.name, error = %e, "claiming next command failed");
            })?
            else {
                break;
            };

            visited.insert(claimed.command.id);
            self.process(claimed, &mut report)?;
        }

        info!(
            processor = %self.config.name,
            processed = report.processed,
            rejected = report.rejected,
            failed = report.failures.len(),
            dead_lettered = report.dead_lettered,
            truncated = report.truncated,
            "drain finished"
        );
        Ok(report)
    }

    fn process(&self, claimed: ClaimedCommand, report: &mut DrainReport) -> Result<(), ProcessorError> {
        let ClaimedCommand { command, claim } = claimed;
        let span = tracing::debug_span!(
            "command",
            command_id = %command.id,
            kind = %command.kind,
            attempt = command.attempts + 1
        );
        let _entered = span.enter();

        let now = Utc::now();
        let mut uow = self.store.begin()?;

        let dispatched = {
            let mut ctx = HandlerContext::new(&command, now, uow.as_mut());
            self.router.dispatch(&command, &mut ctx)
        };

        let outcome = match dispatched {
            Ok(outcome) => outcome,
            Err(err) => {
                drop(uow);
                if let Some(storage) = storage_failure(&err) {
                    error!(error = %storage, "handler hit a storage failure");
                    return Err(ProcessorError::Store(storage));
                }
                return self.fail(&command, claim, &err.to_string(), now, report);
            }
        };

        match uow
            .mark_processed(command.id, claim)
            .and_then(|()| uow.commit())
        {
            Ok(()) => {
                report.processed += 1;
                match outcome {
                    CommandOutcome::Completed => {
                        report.completed += 1;
                        debug!("command processed");
                    }
                    CommandOutcome::Rejected { codes } => {
                        report.rejected += 1;
                        debug!(codes = ?codes, "command processed with rejection");
                    }
                }
                Ok(())
            }
            Err(StoreError::ClaimLost(_)) => {
                warn!("claim lost before commit; leaving the command to its new owner");
                report.failures.push(CommandFailure {
                    command_id: command.id,
                    kind: command.kind.clone(),
                    attempt: command.attempts + 1,
                    error: StoreError::ClaimLost(command.id).to_string(),
                    dead_lettered: false,
                });
                Ok(())
            }
            Err(e) if e.is_command_local() => {
                self.fail(&command, claim, &format!("commit failed: {e}"), now, report)
            }
            Err(e) => {
                error!(error = %e, "commit failed with a storage error");
                Err(e.into())
            }
        }
    }

    fn fail(
        &self,
        command: &InternalCommand,
        claim: ClaimToken,
        message: &str,
        now: DateTime<Utc>,
        report: &mut DrainReport,
    ) -> Result<(), ProcessorError> {
        let (attempt, dead_lettered) = match self.store.record_failure(
            command.id,
            claim,
            message,
            &self.config.retry_policy,
            now,
        ) {
            Ok(FailureDisposition::Retry {
                attempts,
                not_before,
            }) => {
                warn!(error = message, attempt = attempts, %not_before, "command failed; will retry");
                (attempts, false)
            }
            Ok(FailureDisposition::DeadLettered { attempts }) => {
                warn!(error = message, attempt = attempts, "command dead-lettered");
                report.dead_lettered += 1;
                (attempts, true)
            }
            Err(e) if e.is_command_local() => {
                warn!(error = message, record_error = %e, "command failed; failure not recorded");
                (command.attempts + 1, false)
            }
            Err(e) => {
                error!(error = %e, "recording command failure hit a storage error");
                return Err(e.into());
            }
        };

        report.failures.push(CommandFailure {
            command_id: command.id,
            kind: command.kind.clone(),
            attempt,
            error: message.to_string(),
            dead_lettered,
        });
        Ok(())
    }
}

/// A handler error that is really the store being unusable.
fn storage_failure(err: &DispatchError) -> Option<StoreError> {
    match err {
        DispatchError::Handler(HandlerError::Store(StoreError::Storage(msg)))
        | DispatchError::Handler(HandlerError::Repository(RepositoryError::Storage(msg))) => {
            Some(StoreError::Storage(msg.clone()))
        }
        _ => None,
    }
}

impl<S: CommandStore> std::fmt::Debug for CommandProcessor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandProcessor")
            .field("router", &self.router)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use marketroles_core::InternalCommandPayload;

    use crate::memory::InMemoryDatabase;
    use crate::outbox::scheduler::CommandScheduler;
    use crate::outbox::types::RetryPolicy;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Countdown {
        remaining: u32,
    }

    impl InternalCommandPayload for Countdown {
        const KIND: &'static str = "Countdown";
    }

    fn countdown_router() -> CommandRouter {
        let mut router = CommandRouter::new();
        router
            .register(|c: Countdown, ctx: &mut HandlerContext<'_>| {
                if c.remaining > 0 {
                    ctx.enqueue(&Countdown {
                        remaining: c.remaining - 1,
                    })?;
                }
                Ok(CommandOutcome::Completed)
            })
            .unwrap();
        router
    }

    fn seed(db: &InMemoryDatabase, command: &Countdown) {
        let mut uow = db.begin().unwrap();
        uow.enqueue(command).unwrap();
        uow.commit().unwrap();
    }

    #[test]
    fn follow_up_chain_is_drained_in_one_invocation() {
        let db = InMemoryDatabase::new();
        seed(&db, &Countdown { remaining: 3 });

        let processor = CommandProcessor::new(db.clone(), countdown_router(), ProcessorConfig::default());
        let report = processor.drain().unwrap();

        assert_eq!(report.processed, 4);
        assert!(report.is_clean());
        assert!(!report.truncated);
        assert_eq!(db.stats().unwrap().pending, 0);
    }

    #[test]
    fn snapshot_policy_defers_follow_ups() {
        let db = InMemoryDatabase::new();
        seed(&db, &Countdown { remaining: 2 });

        let config = ProcessorConfig::default().with_drain_policy(DrainPolicy::SnapshotAtStart);
        let processor = CommandProcessor::new(db.clone(), countdown_router(), config);

        assert_eq!(processor.drain().unwrap().processed, 1);
        assert_eq!(processor.drain().unwrap().processed, 1);
        assert_eq!(processor.drain().unwrap().processed, 1);
        assert_eq!(processor.drain().unwrap(), DrainReport::default());
    }

    #[test]
    fn safety_bound_truncates_runaway_chains() {
        let db = InMemoryDatabase::new();
        seed(&db, &Countdown { remaining: 100 });

        let config = ProcessorConfig::default().with_max_commands_per_drain(10);
        let processor = CommandProcessor::new(db.clone(), countdown_router(), config);
        let report = processor.drain().unwrap();

        assert_eq!(report.processed, 10);
        assert!(report.truncated);
        assert_eq!(db.stats().unwrap().pending, 1);
    }

    #[test]
    fn unknown_kind_is_a_command_local_failure() {
        let db = InMemoryDatabase::new();
        seed(&db, &Countdown { remaining: 0 });

        let config = ProcessorConfig::default().with_retry_policy(RetryPolicy::fixed(3, Duration::ZERO));
        let processor = CommandProcessor::new(db.clone(), CommandRouter::new(), config);
        let report = processor.drain().unwrap();

        assert_eq!(report.processed, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, "Countdown");
        assert_eq!(report.failures[0].attempt, 1);
        assert!(report.failures[0].error.contains("no handler"));
        assert!(!report.failures[0].dead_lettered);
    }
}
