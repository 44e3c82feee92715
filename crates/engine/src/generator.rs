use crate::EngineContext;
use crate::error::EngineError;
use crate::store::SharedStore;
use api_client::MarketAccess;
use core_types::math::{percentage_of, round_price, whole_units};
use executor::Executor;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundedSymbol {
    pub symbol: String,
    pub units: i64,
    pub price: Decimal,
    pub order_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub funded: Vec<FundedSymbol>,
    pub skipped: Vec<String>,
}

/// Funds a freshly composed index with the configured starting balance.
pub struct IndexGenerator {
    store: SharedStore,
    market: Arc<dyn MarketAccess>,
    executor: Arc<dyn Executor>,
}

impl IndexGenerator {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            store: ctx.store.clone(),
            market: ctx.market.clone(),
            executor: ctx.executor.clone(),
        }
    }

    pub async fn generate(&self) -> Result<GenerateSummary, EngineError> {
        self.generate_with_progress(|_, _| {}).await
    }

    /// Buys every non-cash symbol at its desired share of the starting balance
    /// and marks the index active.
    ///
    /// `on_symbol` is called after each symbol with its name and the number of
    /// symbols being funded. Per-symbol failures are logged and skipped.
    pub async fn generate_with_progress<F>(&self, mut on_symbol: F) -> Result<GenerateSummary, EngineError>
    where
        F: FnMut(&str, usize) + Send,
    {
        let store = self.store.lock().await;
        let mut config = store.get_configuration().await?;
        if config.active {
            return Err(EngineError::IndexAlreadyGenerated);
        }

        let account_value = self.market.get_account_value().await?;
        if account_value < config.starting_balance {
            return Err(EngineError::InsufficientAccountValue {
                required: config.starting_balance,
                available: account_value,
            });
        }

        let symbols: Vec<_> = store
            .get_all_indexed_symbols()
            .await?
            .into_iter()
            .filter(|s| !s.is_cash())
            .collect();
        let total = symbols.len();
        let mut summary = GenerateSummary::default();
        tracing::info!(symbols = total, starting_balance = %config.starting_balance, "Generating index.");

        for mut symbol in symbols {
            let name = symbol.symbol.clone();
            let quote = match self.market.get_symbol_quote_price(&name).await {
                Ok(quote) => round_price(quote),
                Err(e) => {
                    tracing::error!(symbol = %name, error = %e, "Failed to fetch quote, symbol left unfunded.");
                    summary.skipped.push(name.clone());
                    on_symbol(&name, total);
                    continue;
                }
            };

            let budget = percentage_of(config.starting_balance, symbol.desired_percentage);
            let units = whole_units(budget, quote);
            if units == 0 {
                tracing::warn!(symbol = %name, %budget, price = %quote, "Allocation is worth less than one unit, symbol left unfunded.");
                summary.skipped.push(name.clone());
                on_symbol(&name, total);
                continue;
            }

            match self
                .executor
                .fulfill_market_order_buy(&name, units, config.order_timeout())
                .await
            {
                Ok(fill) => {
                    symbol.current_price = quote;
                    symbol.amount = units;
                    symbol.current_percentage = symbol.desired_percentage;
                    symbol.last_order_id = Some(fill.order_id.clone());
                    if let Err(e) = store.update_indexed_symbol(&symbol).await {
                        tracing::error!(symbol = %name, error = %e, "Failed to persist funded holdings.");
                    }
                    summary.funded.push(FundedSymbol {
                        symbol: name.clone(),
                        units,
                        price: quote,
                        order_id: fill.order_id,
                    });
                }
                Err(e) => {
                    tracing::error!(symbol = %name, units, error = %e, "Failed to fund symbol.");
                    summary.skipped.push(name.clone());
                }
            }
            on_symbol(&name, total);
        }

        config.active = true;
        store.update_configuration(&config).await?;
        tracing::info!(funded = summary.funded.len(), skipped = summary.skipped.len(), "Index generated.");
        Ok(summary)
    }
}
