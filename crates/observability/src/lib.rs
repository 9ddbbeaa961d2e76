//! Process-wide tracing setup shared by everything that drives the outbox.
//!
//! No library crate in the workspace depends on this one. The binary that
//! embeds the market processor calls [`init`] once at start-up, before
//! `marketroles_infra::runtime::build_processor`. Library crates only emit
//! `tracing` events and never install a subscriber.

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use tracing::LogFormat;
