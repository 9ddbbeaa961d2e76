//! Start-up wiring: configuration → converters → router → processor.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::{DatabaseConfig, MarketConfig, ProcessorConfig};
use crate::outbox::{CommandProcessor, CommandStore};
use crate::postgres::PostgresDatabase;
use crate::processes::{MarketHandlers, market_router};

/// Build a processor over `store` with every market handler registered.
///
/// Fails when a violation kind has no converter or a command kind has no
/// handler, so an incomplete build never starts draining.
pub fn build_processor<S: CommandStore>(
    store: S,
    config: ProcessorConfig,
    market: &MarketConfig,
) -> anyhow::Result<CommandProcessor<S>> {
    let handlers = MarketHandlers::from_config(market)
        .context("error converter registry is incomplete")?;
    let router = market_router(Arc::new(handlers)).context("command router is incomplete")?;

    info!(
        processor = %config.name,
        kinds = ?router.kinds(),
        administrator_gln = %market.administrator_gln,
        "command processor ready"
    );
    Ok(CommandProcessor::new(store, router, config))
}

/// Connect to Postgres and make sure the outbox schema exists.
pub async fn connect_postgres(config: &DatabaseConfig) -> anyhow::Result<PostgresDatabase> {
    let db = PostgresDatabase::connect(config)
        .await
        .context("failed to connect to Postgres")?;
    db.ensure_schema()
        .await
        .context("failed to apply outbox schema")?;
    Ok(db)
}

/// Build a Postgres-backed processor from the environment.
pub async fn processor_from_env() -> anyhow::Result<CommandProcessor<PostgresDatabase>> {
    let database = DatabaseConfig::from_env().context("invalid database configuration")?;
    let processor = ProcessorConfig::from_env().context("invalid processor configuration")?;
    let market = MarketConfig::from_env().context("invalid market configuration")?;

    let db = connect_postgres(&database).await?;
    build_processor(db, processor, &market)
}
