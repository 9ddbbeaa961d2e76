//! Transactional outbox of internal commands.
//!
//! Producers enqueue typed commands into a [`UnitOfWork`] together with their
//! state changes; the [`CommandProcessor`] later drains the outbox, routing
//! each command to its handler and marking it processed in the same commit as
//! the handler's own writes.

pub mod processor;
pub mod router;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod unit_of_work;

pub use processor::{CommandFailure, CommandProcessor, DrainReport, ProcessorError};
pub use router::{
    CommandOutcome, CommandRouter, DispatchError, HandlerContext, HandlerError, RouterError,
};
pub use scheduler::CommandScheduler;
pub use store::{CommandStore, StoreError};
pub use types::{
    BackoffStrategy, ClaimFilter, ClaimToken, ClaimedCommand, CommandStats, DrainPolicy,
    FailureDisposition, InternalCommand, RetryPolicy,
};
pub use unit_of_work::UnitOfWork;
