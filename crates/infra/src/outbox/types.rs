//! Outbox row, claim and policy types.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marketroles_core::{CommandId, InternalCommandPayload};

/// A deferred unit of business work, persisted in the outbox.
///
/// `processed` is the business-relevant flag; the remaining bookkeeping fields
/// (`attempts`, `last_error`, `not_before`, `dead_lettered_at`) are owned by the
/// command store's retry handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalCommand {
    pub id: CommandId,
    /// Stable discriminator used for routing and deserialization.
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    /// Insertion order, assigned by the store when the row is committed.
    pub sequence: Option<u64>,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Earliest time the command may be claimed again (retry backoff).
    pub not_before: Option<DateTime<Utc>>,
    pub dead_lettered_at: Option<DateTime<Utc>>,
}

impl InternalCommand {
    pub fn new(
        id: CommandId,
        kind: impl Into<String>,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            payload,
            created_at,
            processed: false,
            processed_at: None,
            sequence: None,
            attempts: 0,
            last_error: None,
            not_before: None,
            dead_lettered_at: None,
        }
    }

    /// Serialize a typed command into an unprocessed row.
    pub fn from_payload<C: InternalCommandPayload>(
        id: CommandId,
        command: &C,
        created_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(id, C::KIND, serde_json::to_value(command)?, created_at))
    }

    pub fn is_dead_lettered(&self) -> bool {
        self.dead_lettered_at.is_some()
    }

    /// Whether the row may be dispatched at `now` (ignoring claims).
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        !self.processed
            && !self.is_dead_lettered()
            && self.not_before.is_none_or(|at| at <= now)
    }
}

/// Proof of ownership of a claimed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimToken(Uuid);

impl ClaimToken {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClaimToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClaimToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A command claimed for dispatch, together with its claim token.
#[derive(Debug, Clone)]
pub struct ClaimedCommand {
    pub command: InternalCommand,
    pub claim: ClaimToken,
}

/// Restricts which command `claim_next` may hand out.
#[derive(Debug, Clone, Copy)]
pub struct ClaimFilter<'a> {
    /// Commands already dispatched in the current drain.
    pub exclude: &'a HashSet<CommandId>,
    /// Inclusive upper bound on `sequence`.
    pub up_to_sequence: Option<u64>,
    /// How long the claim keeps other processors away.
    pub lease: Duration,
}

/// Whether commands enqueued during a drain are processed by the same drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrainPolicy {
    /// Follow-up commands are drained in the same invocation.
    #[default]
    IncludeNewlyEnqueued,
    /// Only commands committed before the drain started are processed.
    SnapshotAtStart,
}

impl std::str::FromStr for DrainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "include-new" | "include-newly-enqueued" => Ok(DrainPolicy::IncludeNewlyEnqueued),
            "snapshot" | "snapshot-at-start" => Ok(DrainPolicy::SnapshotAtStart),
            other => Err(format!(
                "unknown drain policy '{other}' (expected 'include-new' or 'snapshot')"
            )),
        }
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^(attempt - 1)
    #[default]
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

/// Bounded retry policy for failing commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Failed attempts after which a command is dead-lettered.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Dead-letter on the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay before the next attempt after `attempt` failures (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor)
            }
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
        };
        delay.min(self.max_delay)
    }

    /// Whether a command that has failed `attempts` times may be retried.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// What `record_failure` did with the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDisposition {
    Retry {
        attempts: u32,
        not_before: DateTime<Utc>,
    },
    DeadLettered {
        attempts: u32,
    },
}

/// `now + delta`, saturating at the end of time.
pub(crate) fn offset_by(now: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    chrono::TimeDelta::from_std(delta)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Outbox statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    /// Unprocessed, not dead-lettered.
    pub pending: usize,
    /// Pending with a live claim.
    pub in_flight: usize,
    /// Pending with at least one failed attempt.
    pub failing: usize,
    pub processed: usize,
    pub dead_lettered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[test]
    fn fixed_and_linear_backoff() {
        let fixed = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(fixed.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(fixed.delay_for_attempt(3), Duration::from_millis(250));

        let linear = RetryPolicy {
            strategy: BackoffStrategy::Linear,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(linear.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!RetryPolicy::no_retry().should_retry(0));
    }

    #[test]
    fn drain_policy_parses_config_values() {
        assert_eq!("include-new".parse(), Ok(DrainPolicy::IncludeNewlyEnqueued));
        assert_eq!(" Snapshot ".parse(), Ok(DrainPolicy::SnapshotAtStart));
        assert!("later".parse::<DrainPolicy>().is_err());
        assert_eq!(DrainPolicy::default(), DrainPolicy::IncludeNewlyEnqueued);
    }

    #[test]
    fn readiness_honours_backoff_and_dead_letter() {
        let now = Utc::now();
        let mut command = InternalCommand::new(CommandId::new(), "Ping", serde_json::json!({}), now);
        assert!(command.is_ready(now));

        command.not_before = Some(now + chrono::Duration::seconds(5));
        assert!(!command.is_ready(now));
        assert!(command.is_ready(now + chrono::Duration::seconds(5)));

        command.not_before = None;
        command.dead_lettered_at = Some(now);
        assert!(!command.is_ready(now));
    }
}
