//! Handlers for the market process commands and the intake operations that
//! start them.
//!
//! ```text
//! receive_move_in ──▶ Transaction + RequestMoveIn ──▶ (drain)
//!   RequestMoveIn ──▶ rules ──┬─ violations ──▶ Reject document
//!                             └─ ok ──▶ register process + Confirm document
//!                                        + EffectuateMoveIn ──▶ (drain) ──▶ supplier switched
//! ```

mod aggregation;
mod change_of_supplier;
mod intake;
mod move_in;
mod requests;

use std::sync::Arc;

use marketroles_edi::{ErrorConverterRegistry, RegistryError, market_error_converters};
use marketroles_processes::{
    COMMAND_KINDS, EffectuateChangeOfSupplier, EffectuateMoveIn, ForwardAggregationResult,
    GlnNumber, MarketViolation, RequestChangeOfSupplier, RequestMoveIn,
};

use crate::config::MarketConfig;
use crate::outbox::{CommandRouter, HandlerContext, RouterError};

pub use aggregation::handle_forward_aggregation_result;
pub use change_of_supplier::{handle_effectuate_change_of_supplier, handle_request_change_of_supplier};
pub use intake::{IntakeError, receive_change_of_supplier, receive_move_in};
pub use move_in::{handle_effectuate_move_in, handle_request_move_in};

/// Shared, immutable dependencies of the market handlers.
#[derive(Debug)]
pub struct MarketHandlers {
    converters: ErrorConverterRegistry<MarketViolation>,
    administrator_gln: GlnNumber,
}

impl MarketHandlers {
    pub fn new(converters: ErrorConverterRegistry<MarketViolation>, market: &MarketConfig) -> Self {
        Self {
            converters,
            administrator_gln: market.administrator_gln.clone(),
        }
    }

    /// Handlers with the complete market converter registry.
    pub fn from_config(market: &MarketConfig) -> Result<Self, RegistryError> {
        Ok(Self::new(market_error_converters()?, market))
    }

    pub fn converters(&self) -> &ErrorConverterRegistry<MarketViolation> {
        &self.converters
    }

    /// Sender of every document we answer with.
    pub fn administrator_gln(&self) -> &GlnNumber {
        &self.administrator_gln
    }
}

/// Router with a handler for every market command kind.
pub fn market_router(handlers: Arc<MarketHandlers>) -> Result<CommandRouter, RouterError> {
    let mut router = CommandRouter::new();

    let h = handlers.clone();
    router.register(move |cmd: RequestMoveIn, ctx: &mut HandlerContext<'_>| {
        handle_request_move_in(&h, cmd, ctx)
    })?;
    router.register(|cmd: EffectuateMoveIn, ctx: &mut HandlerContext<'_>| {
        handle_effectuate_move_in(cmd, ctx)
    })?;

    let h = handlers;
    router.register(move |cmd: RequestChangeOfSupplier, ctx: &mut HandlerContext<'_>| {
        handle_request_change_of_supplier(&h, cmd, ctx)
    })?;
    router.register(|cmd: EffectuateChangeOfSupplier, ctx: &mut HandlerContext<'_>| {
        handle_effectuate_change_of_supplier(cmd, ctx)
    })?;

    router.register(|cmd: ForwardAggregationResult, ctx: &mut HandlerContext<'_>| {
        handle_forward_aggregation_result(cmd, ctx)
    })?;

    router.ensure_complete(COMMAND_KINDS)?;
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_router_covers_every_command_kind() {
        let market = MarketConfig::from_lookup(|_| None).unwrap();
        let handlers = Arc::new(MarketHandlers::from_config(&market).unwrap());
        let router = market_router(handlers).unwrap();

        let mut expected: Vec<&str> = COMMAND_KINDS.to_vec();
        expected.sort_unstable();
        assert_eq!(router.kinds(), expected);
    }
}
