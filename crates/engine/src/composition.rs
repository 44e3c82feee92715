use crate::error::EngineError;
use crate::redistribution::{EqualSplit, RedistributionStrategy};
use crate::store::SharedStore;
use api_client::MarketAccess;
use core_types::math::{HUNDRED, normalize_symbol, round_percentage, validate_percentage};
use core_types::{CASH_SYMBOL, IndexedSymbol, NewIndexedSymbol};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Maintains the set of indexed symbols and their target allocations.
pub struct IndexComposer {
    store: SharedStore,
    market: Arc<dyn MarketAccess>,
    strategy: Box<dyn RedistributionStrategy>,
}

impl IndexComposer {
    pub fn new(store: SharedStore, market: Arc<dyn MarketAccess>) -> Self {
        Self {
            store,
            market,
            strategy: Box::new(EqualSplit),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn RedistributionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Adds `symbol` to the index at `desired_percentage`.
    ///
    /// When the free allocation cannot cover the request, the unlocked symbols
    /// give up exactly `desired_percentage` between them according to the
    /// configured strategy. Every failure leaves the index untouched.
    pub async fn add_symbol(
        &self,
        symbol: &str,
        desired_percentage: Decimal,
        locked: bool,
    ) -> Result<IndexedSymbol, EngineError> {
        let symbol = normalize_symbol(symbol)?;
        let desired_percentage = validate_percentage(desired_percentage)?;

        let store = self.store.lock().await;
        if store.is_symbol_indexed(&symbol).await? {
            return Err(EngineError::AlreadyIndexed(symbol));
        }

        let current_price = if symbol == CASH_SYMBOL {
            Decimal::ZERO
        } else {
            if !self.market.check_if_symbol_is_valid(&symbol).await? {
                return Err(EngineError::SymbolNotTradeable(symbol));
            }
            self.market.get_symbol_quote_price(&symbol).await?
        };

        let existing = store.get_all_indexed_symbols().await?;
        let adjusted = plan_addition(&existing, desired_percentage, self.strategy.as_ref())?;
        let new_symbol = NewIndexedSymbol {
            symbol,
            locked,
            desired_percentage,
            current_price,
        };

        let created = if adjusted.is_empty() {
            store.create_indexed_symbol(&new_symbol).await?
        } else {
            for symbol in &adjusted {
                tracing::debug!(symbol = %symbol.symbol, desired = %symbol.desired_percentage, "Reducing allocation to make room.");
            }
            store.insert_with_adjustments(&adjusted, &new_symbol).await?
        };

        tracing::info!(
            symbol = %created.symbol,
            desired = %created.desired_percentage,
            locked = created.locked,
            redistributed = adjusted.len(),
            strategy = self.strategy.name(),
            "Symbol added to index."
        );
        Ok(created)
    }
}

/// Works out which existing symbols change, and how, to fit `requested`.
///
/// Returns an empty list when the free allocation already covers the request.
/// Otherwise returns every unlocked symbol with its reduced desired percentage;
/// the reductions sum to exactly `requested`.
pub fn plan_addition(
    existing: &[IndexedSymbol],
    requested: Decimal,
    strategy: &dyn RedistributionStrategy,
) -> Result<Vec<IndexedSymbol>, EngineError> {
    let (unlocked, locked): (Vec<&IndexedSymbol>, Vec<&IndexedSymbol>) =
        existing.iter().partition(|s| !s.locked);
    let total_unlocked: Decimal = unlocked.iter().map(|s| s.desired_percentage).sum();
    let total_locked: Decimal = locked.iter().map(|s| s.desired_percentage).sum();
    let free = round_percentage(HUNDRED - total_locked - total_unlocked);

    if free >= requested {
        return Ok(Vec::new());
    }
    if total_unlocked < requested {
        return Err(EngineError::InsufficientCapacity {
            requested,
            available: total_unlocked,
        });
    }

    let unlocked: Vec<IndexedSymbol> = unlocked.into_iter().cloned().collect();
    let reductions = strategy.reductions(&unlocked, requested);

    let mut adjusted = Vec::with_capacity(unlocked.len());
    for (mut symbol, reduction) in unlocked.into_iter().zip(reductions) {
        let reduced = round_percentage(symbol.desired_percentage - reduction);
        if reduced < Decimal::ZERO {
            return Err(EngineError::InsufficientCapacity {
                requested,
                available: total_unlocked,
            });
        }
        symbol.desired_percentage = reduced;
        adjusted.push(symbol);
    }
    Ok(adjusted)
}
