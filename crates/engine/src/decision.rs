use crate::error::EngineError;
use core_types::math::{percentage_of, round_percentage, whole_units};
use core_types::{Fill, IndexedSymbol, RebalanceConfig};
use database::StateStore;
use executor::Executor;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Why a symbol that drifted past the threshold was not traded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The drift is worth less than one unit.
    BelowOneUnit,
    /// Not enough floating percentage to fund the buy.
    InsufficientFloating,
    /// No fresh quote this cycle, so the persisted drift cannot be trusted.
    StaleQuote,
    /// The gateway returned an error.
    OrderFailed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeReport {
    pub sells: Vec<Fill>,
    pub buys: Vec<Fill>,
    pub skipped: Vec<(String, SkipReason)>,
}

/// Decides and places the trades that pull drifted symbols back to target.
pub struct TradeDecisioner {
    executor: Arc<dyn Executor>,
}

impl TradeDecisioner {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Runs the sell pass then the buy pass over the persisted index, updating
    /// `config.floating_percentage` as budget is freed and spent.
    ///
    /// The configuration is written back once, after both passes. Failures on
    /// individual symbols are logged and recorded in the report.
    pub async fn run_passes(
        &self,
        store: &dyn StateStore,
        config: &mut RebalanceConfig,
    ) -> Result<TradeReport, EngineError> {
        self.run_passes_except(store, config, &[]).await
    }

    /// Same as [`run_passes`](Self::run_passes), leaving the symbols in
    /// `stale` out of both passes. A cycle passes the symbols its drift
    /// recomputation could not reprice.
    pub async fn run_passes_except(
        &self,
        store: &dyn StateStore,
        config: &mut RebalanceConfig,
        stale: &[String],
    ) -> Result<TradeReport, EngineError> {
        let mut report = TradeReport::default();
        let mut symbols = Vec::new();
        for symbol in store.get_all_indexed_symbols().await? {
            if symbol.is_cash() {
                continue;
            }
            if stale.contains(&symbol.symbol) {
                tracing::warn!(symbol = %symbol.symbol, "No fresh quote this cycle, not trading symbol.");
                report.skipped.push((symbol.symbol, SkipReason::StaleQuote));
                continue;
            }
            symbols.push(symbol);
        }

        for symbol in symbols.iter_mut() {
            self.sell_excess(store, config, symbol, &mut report).await;
        }
        for symbol in symbols.iter_mut() {
            self.buy_deficit(store, config, symbol, &mut report).await;
        }

        store.update_configuration(config).await?;
        tracing::info!(
            sells = report.sells.len(),
            buys = report.buys.len(),
            skipped = report.skipped.len(),
            floating = %config.floating_percentage,
            "Trade passes complete."
        );
        Ok(report)
    }

    async fn sell_excess(
        &self,
        store: &dyn StateStore,
        config: &mut RebalanceConfig,
        symbol: &mut IndexedSymbol,
        report: &mut TradeReport,
    ) {
        let difference = drift(symbol);
        if difference <= config.rebalance_threshold {
            return;
        }

        let excess_usd = percentage_of(symbol.holding_value(), difference);
        let units = whole_units(excess_usd, symbol.current_price).min(symbol.amount);
        if units == 0 {
            tracing::warn!(symbol = %symbol.symbol, drift = %difference, "Unable to partially sell, drift is worth less than one unit.");
            report.skipped.push((symbol.symbol.clone(), SkipReason::BelowOneUnit));
            return;
        }

        match self
            .executor
            .fulfill_market_order_sell(&symbol.symbol, units, config.order_timeout())
            .await
        {
            Ok(fill) => {
                symbol.amount -= units;
                symbol.last_order_id = Some(fill.order_id.clone());
                persist(store, symbol).await;
                config.floating_percentage += difference;
                tracing::info!(symbol = %symbol.symbol, units, freed = %difference, "Sold excess.");
                report.sells.push(fill);
            }
            Err(e) => {
                tracing::error!(symbol = %symbol.symbol, units, error = %e, "Sell failed.");
                report
                    .skipped
                    .push((symbol.symbol.clone(), SkipReason::OrderFailed(e.to_string())));
            }
        }
    }

    async fn buy_deficit(
        &self,
        store: &dyn StateStore,
        config: &mut RebalanceConfig,
        symbol: &mut IndexedSymbol,
        report: &mut TradeReport,
    ) {
        let difference = drift(symbol);
        let deficit = -difference;
        if deficit <= config.rebalance_threshold {
            return;
        }

        if config.floating_percentage < deficit {
            tracing::warn!(
                symbol = %symbol.symbol,
                deficit = %deficit,
                floating = %config.floating_percentage,
                "Floating percentage is not large enough to fund buy."
            );
            report
                .skipped
                .push((symbol.symbol.clone(), SkipReason::InsufficientFloating));
            return;
        }

        let deficit_usd = percentage_of(symbol.holding_value(), deficit);
        let units = whole_units(deficit_usd, symbol.current_price);
        if units == 0 {
            tracing::warn!(symbol = %symbol.symbol, drift = %difference, "Unable to partially buy, drift is worth less than one unit.");
            report.skipped.push((symbol.symbol.clone(), SkipReason::BelowOneUnit));
            return;
        }

        match self
            .executor
            .fulfill_market_order_buy(&symbol.symbol, units, config.order_timeout())
            .await
        {
            Ok(fill) => {
                symbol.amount += units;
                symbol.last_order_id = Some(fill.order_id.clone());
                persist(store, symbol).await;
                config.floating_percentage -= deficit;
                tracing::info!(symbol = %symbol.symbol, units, spent = %deficit, "Bought deficit.");
                report.buys.push(fill);
            }
            Err(e) => {
                tracing::error!(symbol = %symbol.symbol, units, error = %e, "Buy failed.");
                report
                    .skipped
                    .push((symbol.symbol.clone(), SkipReason::OrderFailed(e.to_string())));
            }
        }
    }
}

/// Current minus desired percentage, in percentage points.
fn drift(symbol: &IndexedSymbol) -> Decimal {
    round_percentage(symbol.current_percentage - symbol.desired_percentage)
}

async fn persist(store: &dyn StateStore, symbol: &IndexedSymbol) {
    if let Err(e) = store.update_indexed_symbol(symbol).await {
        // The order already filled; the next drift pass works from stale holdings.
        tracing::error!(symbol = %symbol.symbol, amount = symbol.amount, error = %e, "Failed to persist holdings after fill.");
    }
}
