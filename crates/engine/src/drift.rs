use crate::error::EngineError;
use api_client::MarketAccess;
use core_types::math::{percentage_difference, percentage_of, round_percentage, round_price, round_usd};
use core_types::RebalanceConfig;
use database::StateStore;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Outcome of one drift recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    pub updated: Vec<String>,
    /// Symbols left untouched this cycle because of a quote or write failure.
    pub skipped: Vec<String>,
}

/// Re-prices every indexed symbol and records how far it has drifted.
pub struct DriftCalculator {
    market: Arc<dyn MarketAccess>,
}

impl DriftCalculator {
    pub fn new(market: Arc<dyn MarketAccess>) -> Self {
        Self { market }
    }

    /// Refreshes `current_price` and `current_percentage` of every non-cash symbol.
    ///
    /// A failure on one symbol is logged and skipped; only the initial read of
    /// the index can fail the whole call.
    pub async fn recompute_all(
        &self,
        store: &dyn StateStore,
        config: &RebalanceConfig,
    ) -> Result<DriftReport, EngineError> {
        let mut report = DriftReport::default();

        for mut symbol in store.get_all_indexed_symbols().await? {
            if symbol.is_cash() {
                continue;
            }

            let quote = match self.market.get_symbol_quote_price(&symbol.symbol).await {
                Ok(quote) => round_price(quote),
                Err(e) => {
                    tracing::warn!(symbol = %symbol.symbol, error = %e, "Failed to fetch quote, skipping symbol this cycle.");
                    report.skipped.push(symbol.symbol.clone());
                    continue;
                }
            };

            symbol.current_price = quote;
            symbol.current_percentage = current_percentage(
                symbol.desired_percentage,
                quote,
                symbol.amount,
                config.starting_balance,
            );

            if let Err(e) = store.update_indexed_symbol(&symbol).await {
                tracing::error!(symbol = %symbol.symbol, error = %e, "Failed to persist drift.");
                report.skipped.push(symbol.symbol.clone());
                continue;
            }

            tracing::info!(
                symbol = %symbol.symbol,
                price = %symbol.current_price,
                desired = %symbol.desired_percentage,
                current = %symbol.current_percentage,
                "Recomputed drift."
            );
            report.updated.push(symbol.symbol);
        }

        Ok(report)
    }
}

/// The desired percentage moved by the relative deviation of the holding's
/// value from its target value.
pub fn current_percentage(
    desired_percentage: Decimal,
    price: Decimal,
    amount: i64,
    starting_balance: Decimal,
) -> Decimal {
    let holding = round_usd(price * Decimal::from(amount));
    let desired_usd = percentage_of(starting_balance, desired_percentage);
    let deviation = percentage_difference(desired_usd, holding);
    round_percentage(desired_percentage + deviation)
}
