//! Runtime configuration.
//!
//! Every setting has a default; environment variables override them.
//! `from_env` reads the process environment, `from_lookup` takes any
//! key → value source (tests use a map).

use std::time::Duration;

use marketroles_processes::GlnNumber;

use crate::outbox::{DrainPolicy, RetryPolicy};

pub const ENV_PROCESSOR_NAME: &str = "MARKETROLES_PROCESSOR_NAME";
pub const ENV_DRAIN_POLICY: &str = "MARKETROLES_DRAIN_POLICY";
pub const ENV_MAX_ATTEMPTS: &str = "MARKETROLES_MAX_ATTEMPTS";
pub const ENV_RETRY_BASE_DELAY_MS: &str = "MARKETROLES_RETRY_BASE_DELAY_MS";
pub const ENV_RETRY_MAX_DELAY_MS: &str = "MARKETROLES_RETRY_MAX_DELAY_MS";
pub const ENV_CLAIM_LEASE_SECS: &str = "MARKETROLES_CLAIM_LEASE_SECS";
pub const ENV_MAX_COMMANDS_PER_DRAIN: &str = "MARKETROLES_MAX_COMMANDS_PER_DRAIN";
pub const ENV_ADMINISTRATOR_GLN: &str = "MARKETROLES_ADMINISTRATOR_GLN";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DB_MAX_CONNECTIONS: &str = "MARKETROLES_DB_MAX_CONNECTIONS";

/// GLN of the metering point administrator answering requests (DataHub).
pub const DEFAULT_ADMINISTRATOR_GLN: &str = "5790001330583";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is not set")]
    Missing { key: &'static str },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Drain loop configuration.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Name for logging
    pub name: String,
    pub drain_policy: DrainPolicy,
    pub retry_policy: RetryPolicy,
    /// How long a claimed command stays invisible to other processors.
    pub claim_lease: Duration,
    /// Safety bound against runaway follow-up chains.
    pub max_commands_per_drain: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            name: "command-processor".to_string(),
            drain_policy: DrainPolicy::default(),
            retry_policy: RetryPolicy::default(),
            claim_lease: Duration::from_secs(30),
            max_commands_per_drain: 10_000,
        }
    }
}

impl ProcessorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.drain_policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    pub fn with_max_commands_per_drain(mut self, max: usize) -> Self {
        self.max_commands_per_drain = max;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_PROCESSOR_NAME) {
            config.name = name;
        }
        if let Some(policy) = lookup(ENV_DRAIN_POLICY) {
            config.drain_policy = policy.parse().map_err(|message| ConfigError::Invalid {
                key: ENV_DRAIN_POLICY,
                message,
            })?;
        }
        if let Some(max) = parse(&lookup, ENV_MAX_ATTEMPTS)? {
            config.retry_policy.max_attempts = max;
        }
        if let Some(ms) = parse(&lookup, ENV_RETRY_BASE_DELAY_MS)? {
            config.retry_policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(&lookup, ENV_RETRY_MAX_DELAY_MS)? {
            config.retry_policy.max_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse(&lookup, ENV_CLAIM_LEASE_SECS)? {
            config.claim_lease = Duration::from_secs(secs);
        }
        if let Some(max) = parse(&lookup, ENV_MAX_COMMANDS_PER_DRAIN)? {
            config.max_commands_per_drain = max;
        }

        if config.max_commands_per_drain == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_MAX_COMMANDS_PER_DRAIN,
                message: "must be at least 1".to_string(),
            });
        }
        Ok(config)
    }
}

/// Market-facing identity of this installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfig {
    pub administrator_gln: GlnNumber,
}

impl MarketConfig {
    pub fn new(administrator_gln: GlnNumber) -> Self {
        Self { administrator_gln }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Falls back to [`DEFAULT_ADMINISTRATOR_GLN`] when the variable is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = lookup(ENV_ADMINISTRATOR_GLN).unwrap_or_else(|| DEFAULT_ADMINISTRATOR_GLN.to_string());
        let administrator_gln = GlnNumber::parse(&raw).map_err(|e| ConfigError::Invalid {
            key: ENV_ADMINISTRATOR_GLN,
            message: e.to_string(),
        })?;
        Ok(Self { administrator_gln })
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(ENV_DATABASE_URL).ok_or(ConfigError::Missing {
            key: ENV_DATABASE_URL,
        })?;
        let mut config = Self::new(url);
        if let Some(max) = parse(&lookup, ENV_DB_MAX_CONNECTIONS)? {
            config.max_connections = max;
        }
        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                message: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ProcessorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.drain_policy, DrainPolicy::IncludeNewlyEnqueued);
        assert_eq!(config.retry_policy, RetryPolicy::default());
        assert_eq!(config.claim_lease, Duration::from_secs(30));
        assert_eq!(config.max_commands_per_drain, 10_000);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ProcessorConfig::from_lookup(lookup(&[
            (ENV_PROCESSOR_NAME, "edge-1"),
            (ENV_DRAIN_POLICY, "snapshot"),
            (ENV_MAX_ATTEMPTS, "3"),
            (ENV_RETRY_BASE_DELAY_MS, "20"),
            (ENV_CLAIM_LEASE_SECS, "5"),
            (ENV_MAX_COMMANDS_PER_DRAIN, "50"),
        ]))
        .unwrap();

        assert_eq!(config.name, "edge-1");
        assert_eq!(config.drain_policy, DrainPolicy::SnapshotAtStart);
        assert_eq!(config.retry_policy.max_attempts, 3);
        assert_eq!(config.retry_policy.base_delay, Duration::from_millis(20));
        assert_eq!(config.claim_lease, Duration::from_secs(5));
        assert_eq!(config.max_commands_per_drain, 50);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = ProcessorConfig::from_lookup(lookup(&[(ENV_MAX_ATTEMPTS, "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_MAX_ATTEMPTS));

        let err = ProcessorConfig::from_lookup(lookup(&[(ENV_MAX_COMMANDS_PER_DRAIN, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_MAX_COMMANDS_PER_DRAIN));

        let err = MarketConfig::from_lookup(lookup(&[(ENV_ADMINISTRATOR_GLN, "5790001330584")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_ADMINISTRATOR_GLN));
    }

    #[test]
    fn market_and_database_settings() {
        assert_eq!(
            MarketConfig::from_lookup(lookup(&[])).unwrap().administrator_gln.as_str(),
            DEFAULT_ADMINISTRATOR_GLN
        );

        assert_eq!(
            DatabaseConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing { key: ENV_DATABASE_URL })
        );
        let db = DatabaseConfig::from_lookup(lookup(&[
            (ENV_DATABASE_URL, "postgres://localhost/marketroles"),
            (ENV_DB_MAX_CONNECTIONS, "4"),
        ]))
        .unwrap();
        assert_eq!(db.max_connections, 4);
    }
}
