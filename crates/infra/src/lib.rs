//! Infrastructure layer: the internal-command outbox, its in-memory and
//! Postgres backends, aggregate repositories, market process handlers and
//! start-up wiring.

pub mod config;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod processes;
pub mod repositories;
pub mod runtime;

pub use config::{ConfigError, DatabaseConfig, MarketConfig, ProcessorConfig};
pub use memory::{InMemoryDatabase, InMemoryUnitOfWork};
pub use outbox::{
    CommandOutcome, CommandProcessor, CommandRouter, CommandScheduler, CommandStore, DrainPolicy,
    DrainReport, HandlerContext, HandlerError, InternalCommand, ProcessorError, RetryPolicy,
    StoreError, UnitOfWork,
};
pub use postgres::{PostgresDatabase, PostgresUnitOfWork};
pub use processes::{MarketHandlers, market_router};
pub use repositories::{AccountingPointRepository, RepositoryError, TransactionRepository};
