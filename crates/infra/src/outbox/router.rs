//! Static command routing: `kind` discriminator → typed deserializer + handler.
//!
//! ```text
//! InternalCommand { kind, payload }
//!   ↓ lookup by kind (UnknownKind if absent)
//! serde_json::from_value::<C>(payload) (Deserialize on failure)
//!   ↓
//! handler(C, &mut HandlerContext) → CommandOutcome | HandlerError
//! ```
//!
//! The router is built explicitly at start-up and handed to the processor;
//! `ensure_complete` proves that every known kind has a handler.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use marketroles_core::{CommandId, DomainError, InternalCommandPayload};
use marketroles_edi::RegistryError;

use crate::repositories::{AccountingPointRepository, RepositoryError, TransactionRepository};

use super::scheduler::CommandScheduler;
use super::store::StoreError;
use super::types::InternalCommand;
use super::unit_of_work::UnitOfWork;

/// Result of a successfully handled command. Both variants mark the command
/// processed: rule violations are data, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    /// Business rules rejected the request; `codes` are the outbound reason codes.
    Rejected { codes: Vec<String> },
}

/// A retryable processing failure raised by a handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Conversion(#[from] RegistryError),

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("a handler is already registered for command kind {0}")]
    DuplicateHandler(String),

    #[error("command kinds without a handler: {}", .0.join(", "))]
    MissingHandlers(Vec<String>),
}

/// Why a command could not be handled.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for command kind {0}")]
    UnknownKind(String),

    #[error("malformed {kind} payload: {message}")]
    Deserialize { kind: String, message: String },

    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),
}

/// What a handler gets to work with for one command.
pub struct HandlerContext<'a> {
    pub command_id: CommandId,
    pub created_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
    uow: &'a mut dyn UnitOfWork,
}

impl<'a> HandlerContext<'a> {
    pub fn new(command: &InternalCommand, now: DateTime<Utc>, uow: &'a mut dyn UnitOfWork) -> Self {
        Self {
            command_id: command.id,
            created_at: command.created_at,
            now,
            uow,
        }
    }

    /// The unit of work the command will be committed in.
    pub fn uow(&mut self) -> &mut dyn UnitOfWork {
        &mut *self.uow
    }

    pub fn transactions(&mut self) -> &mut dyn TransactionRepository {
        self.uow.transactions()
    }

    pub fn accounting_points(&mut self) -> &mut dyn AccountingPointRepository {
        self.uow.accounting_points()
    }

    /// Enqueue a follow-up command in the same unit of work.
    pub fn enqueue<C: InternalCommandPayload>(&mut self, command: &C) -> Result<CommandId, StoreError> {
        self.uow.enqueue(command)
    }
}

type Dispatch = Box<
    dyn Fn(&InternalCommand, &mut HandlerContext<'_>) -> Result<CommandOutcome, DispatchError>
        + Send
        + Sync,
>;

#[derive(Default)]
pub struct CommandRouter {
    routes: HashMap<&'static str, Dispatch>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `C::KIND`.
    pub fn register<C, F>(&mut self, handler: F) -> Result<(), RouterError>
    where
        C: InternalCommandPayload,
        F: Fn(C, &mut HandlerContext<'_>) -> Result<CommandOutcome, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        if self.routes.contains_key(C::KIND) {
            return Err(RouterError::DuplicateHandler(C::KIND.to_string()));
        }

        let dispatch: Dispatch = Box::new(move |command, ctx| {
            let payload: C = serde_json::from_value(command.payload.clone()).map_err(|e| {
                DispatchError::Deserialize {
                    kind: C::KIND.to_string(),
                    message: e.to_string(),
                }
            })?;
            handler(payload, ctx).map_err(DispatchError::Handler)
        });
        self.routes.insert(C::KIND, dispatch);
        Ok(())
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.routes.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.routes.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Start-up check: every kind in `kinds` has a handler.
    pub fn ensure_complete(&self, kinds: &[&str]) -> Result<(), RouterError> {
        let missing: Vec<String> = kinds
            .iter()
            .filter(|kind| !self.handles(kind))
            .map(|kind| kind.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RouterError::MissingHandlers(missing))
        }
    }

    pub fn dispatch(
        &self,
        command: &InternalCommand,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<CommandOutcome, DispatchError> {
        let route = self
            .routes
            .get(command.kind.as_str())
            .ok_or_else(|| DispatchError::UnknownKind(command.kind.clone()))?;
        route(command, ctx)
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDatabase;
    use crate::outbox::store::CommandStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ping {
        n: u32,
    }

    impl InternalCommandPayload for Ping {
        const KIND: &'static str = "Ping";
    }

    fn ping_router() -> CommandRouter {
        let mut router = CommandRouter::new();
        router
            .register(|ping: Ping, _ctx: &mut HandlerContext<'_>| {
                if ping.n == 0 {
                    Err(HandlerError::Failed("zero".to_string()))
                } else {
                    Ok(CommandOutcome::Completed)
                }
            })
            .unwrap();
        router
    }

    fn dispatch(router: &CommandRouter, command: &InternalCommand) -> Result<CommandOutcome, DispatchError> {
        let db = InMemoryDatabase::new();
        let mut uow = db.begin().unwrap();
        let mut ctx = HandlerContext::new(command, Utc::now(), uow.as_mut());
        router.dispatch(command, &mut ctx)
    }

    #[test]
    fn routes_by_kind_and_deserializes_the_payload() {
        let router = ping_router();
        let ok = InternalCommand::from_payload(CommandId::new(), &Ping { n: 1 }, Utc::now()).unwrap();
        assert_eq!(dispatch(&router, &ok).unwrap(), CommandOutcome::Completed);

        let failing = InternalCommand::from_payload(CommandId::new(), &Ping { n: 0 }, Utc::now()).unwrap();
        assert!(matches!(dispatch(&router, &failing), Err(DispatchError::Handler(_))));
    }

    #[test]
    fn unknown_kind_and_malformed_payload_are_distinct_errors() {
        let router = ping_router();

        let unknown = InternalCommand::new(CommandId::new(), "Pong", serde_json::json!({}), Utc::now());
        assert!(matches!(
            dispatch(&router, &unknown),
            Err(DispatchError::UnknownKind(kind)) if kind == "Pong"
        ));

        let malformed =
            InternalCommand::new(CommandId::new(), "Ping", serde_json::json!({ "n": "x" }), Utc::now());
        assert!(matches!(
            dispatch(&router, &malformed),
            Err(DispatchError::Deserialize { kind, .. }) if kind == "Ping"
        ));
    }

    #[test]
    fn duplicate_registration_and_completeness() {
        let mut router = ping_router();
        let err = router
            .register(|_: Ping, _: &mut HandlerContext<'_>| Ok(CommandOutcome::Completed))
            .unwrap_err();
        assert_eq!(err, RouterError::DuplicateHandler("Ping".to_string()));

        assert!(router.ensure_complete(&["Ping"]).is_ok());
        assert_eq!(
            router.ensure_complete(&["Ping", "Pong"]),
            Err(RouterError::MissingHandlers(vec!["Pong".to_string()]))
        );
    }
}
