//! Shared fixtures: an in-memory store and a paper market wired into an engine context.

#![allow(dead_code)]

use api_client::PaperClient;
use core_types::{CASH_SYMBOL, IndexedSymbol, NewIndexedSymbol, RebalanceConfig};
use database::{ConfigDefaults, MemoryStore, StateStore};
use engine::{EngineContext, IndexComposer, SharedStore};
use executor::LiveExecutor;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub paper: Arc<PaperClient>,
    pub ctx: EngineContext,
}

pub fn defaults() -> ConfigDefaults {
    ConfigDefaults {
        rebalance_threshold: dec!(1),
        order_timeout_secs: 10,
        rebalance_frequency_secs: 60,
        starting_balance: dec!(100000),
    }
}

/// A harness whose store has no configuration and no symbols.
pub fn bare_harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let paper = Arc::new(PaperClient::new(dec!(100000)));
    let executor = LiveExecutor::new(paper.clone()).with_poll_interval(Duration::from_millis(10));
    let ctx = EngineContext::new(
        SharedStore::new(store.clone()),
        paper.clone(),
        Arc::new(executor),
    );
    Harness { store, paper, ctx }
}

/// A harness bootstrapped like a first start: configuration plus USD at 100%.
pub async fn harness() -> Harness {
    let harness = bare_harness();
    harness.store.ensure_configuration(&defaults()).await.unwrap();
    harness
}

impl Harness {
    pub fn composer(&self) -> IndexComposer {
        IndexComposer::new(self.ctx.store.clone(), self.ctx.market.clone())
    }

    pub async fn symbol(&self, name: &str) -> IndexedSymbol {
        self.store
            .get_indexed_symbol_by_symbol(name)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{name} is not indexed"))
    }

    pub async fn symbols(&self) -> Vec<IndexedSymbol> {
        self.store.get_all_indexed_symbols().await.unwrap()
    }

    pub async fn desired_total(&self) -> Decimal {
        self.symbols().await.iter().map(|s| s.desired_percentage).sum()
    }

    pub async fn config(&self) -> RebalanceConfig {
        self.store.get_configuration().await.unwrap()
    }

    pub async fn update_config(&self, change: impl FnOnce(&mut RebalanceConfig)) {
        let mut config = self.config().await;
        change(&mut config);
        self.store.update_configuration(&config).await.unwrap();
    }

    /// Inserts a quoted, held symbol directly, bypassing redistribution.
    pub async fn hold(
        &self,
        name: &str,
        desired: Decimal,
        current: Decimal,
        price: Decimal,
        amount: i64,
    ) -> IndexedSymbol {
        self.paper.set_quote(name, price);
        let mut symbol = self
            .store
            .create_indexed_symbol(&NewIndexedSymbol {
                symbol: name.to_string(),
                locked: false,
                desired_percentage: desired,
                current_price: price,
            })
            .await
            .unwrap();
        symbol.current_percentage = current;
        symbol.amount = amount;
        self.store.update_indexed_symbol(&symbol).await.unwrap()
    }

    /// Gives the cash symbol whatever allocation the held symbols leave over.
    pub async fn settle_cash(&self) {
        let symbols = self.symbols().await;
        let held: Decimal = symbols
            .iter()
            .filter(|s| !s.is_cash())
            .map(|s| s.desired_percentage)
            .sum();
        if let Some(mut cash) = symbols.into_iter().find(|s| s.symbol == CASH_SYMBOL) {
            cash.desired_percentage = dec!(100) - held;
            self.store.update_indexed_symbol(&cash).await.unwrap();
        }
    }
}
