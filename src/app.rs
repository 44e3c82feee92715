//! Wiring of the store, broker, executor and engine from `Settings`.

use anyhow::{Context, bail};
use api_client::{AlpacaClient, MarketAccess, PaperClient};
use comfy_table::Table;
use configuration::{BrokerKind, DatabaseBackend, Settings};
use core_types::IndexedSymbol;
use database::{ConfigDefaults, DbRepository, MemoryStore, StateStore, connect, run_migrations};
use engine::{
    EngineContext, GenerateSummary, IndexComposer, IndexGenerator, RebalanceHandle, RebalanceLoop,
    SharedStore, strategy_for,
};
use executor::LiveExecutor;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::report;

pub struct App {
    ctx: EngineContext,
    composer: IndexComposer,
    generator: IndexGenerator,
    pub control: RebalanceHandle,
    control_task: JoinHandle<()>,
}

impl App {
    /// Connects everything the engine needs and spawns the (idle) rebalance loop.
    pub async fn bootstrap(settings: &Settings) -> anyhow::Result<Self> {
        let store = open_store(settings).await?;
        let defaults = ConfigDefaults {
            rebalance_threshold: settings.rebalance.threshold,
            order_timeout_secs: settings.rebalance.order_timeout_secs,
            rebalance_frequency_secs: settings.rebalance.frequency_secs,
            starting_balance: settings.rebalance.starting_balance,
        };
        if store.ensure_configuration(&defaults).await? {
            tracing::info!("Created the rebalance configuration with an all-cash index.");
        }

        let market = open_market(settings).await?;
        let executor = LiveExecutor::new(market.clone())
            .with_poll_interval(Duration::from_millis(settings.broker.poll_interval_ms));

        let ctx = EngineContext::new(SharedStore::new(store), market, Arc::new(executor));
        let composer = IndexComposer::new(ctx.store.clone(), ctx.market.clone())
            .with_strategy(strategy_for(settings.index.redistribution));
        let generator = IndexGenerator::new(&ctx);
        let (control, control_task) = RebalanceLoop::spawn(&ctx);

        Ok(Self {
            ctx,
            composer,
            generator,
            control,
            control_task,
        })
    }

    pub async fn add_symbol(
        &self,
        symbol: &str,
        percentage: Decimal,
        locked: bool,
    ) -> anyhow::Result<IndexedSymbol> {
        Ok(self.composer.add_symbol(symbol, percentage, locked).await?)
    }

    pub async fn generate<F>(&self, on_symbol: F) -> anyhow::Result<GenerateSummary>
    where
        F: FnMut(&str, usize) + Send,
    {
        Ok(self.generator.generate_with_progress(on_symbol).await?)
    }

    pub async fn index_report(&self) -> anyhow::Result<Table> {
        let symbols = self.ctx.store.lock().await.get_all_indexed_symbols().await?;
        Ok(report::index_table(&symbols))
    }

    pub async fn stats_report(&self) -> anyhow::Result<Table> {
        let indexed = self.ctx.store.lock().await.get_all_indexed_symbols().await?.len();
        let account_value = self.ctx.market.get_account_value().await?;
        Ok(report::stats_table(account_value, indexed))
    }

    pub async fn config_report(&self) -> anyhow::Result<Table> {
        let config = self.ctx.store.lock().await.get_configuration().await?;
        Ok(report::config_table(&config))
    }

    /// Drops the loop's last handle and waits for the task to wind down.
    pub async fn shutdown(self) {
        let Self {
            control,
            control_task,
            ..
        } = self;
        drop(control);
        if let Err(e) = control_task.await {
            tracing::warn!(error = %e, "Rebalance loop task ended abnormally.");
        }
    }
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn StateStore>> {
    match settings.database.backend {
        DatabaseBackend::Postgres => {
            let url = settings
                .database
                .resolved_url()
                .context("DATABASE_URL must be set for the postgres backend")?;
            let pool = connect(&url, settings.database.max_connections).await?;
            run_migrations(&pool).await?;
            tracing::info!("Connected to Postgres and applied migrations.");
            Ok(Arc::new(DbRepository::new(pool)))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory store; state is lost on exit.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn open_market(settings: &Settings) -> anyhow::Result<Arc<dyn MarketAccess>> {
    let broker = &settings.broker;
    match broker.kind {
        BrokerKind::Alpaca => {
            let mut client = AlpacaClient::new(&broker.data_endpoint);
            client.connect(&broker.endpoint)?;
            client.set_credentials(&[broker.key.clone(), broker.secret.clone()])?;
            if !client.validate_credentials().await? {
                bail!("the broker rejected the configured credentials");
            }
            tracing::info!(endpoint = %broker.endpoint, "Connected to Alpaca.");
            Ok(Arc::new(client))
        }
        BrokerKind::Paper => {
            let mut client = PaperClient::new(settings.paper.account_value);
            for (symbol, price) in &settings.paper.quotes {
                client.set_quote(&symbol.to_uppercase(), *price);
            }
            client.connect("paper")?;
            tracing::info!(
                quotes = settings.paper.quotes.len(),
                account_value = %settings.paper.account_value,
                "Using the simulated market."
            );
            Ok(Arc::new(client))
        }
    }
}
