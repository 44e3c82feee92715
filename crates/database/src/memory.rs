use crate::error::DbError;
use crate::store::{ConfigDefaults, StateStore};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{CASH_SYMBOL, IndexedSymbol, NewIndexedSymbol, RebalanceConfig};
use rust_decimal::Decimal;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    symbols: Vec<IndexedSymbol>,
    configs: Vec<RebalanceConfig>,
}

/// A process-local `StateStore`.
///
/// Every call takes one short-lived lock, so each call is atomic. Writes can be
/// made to fail on demand to exercise the engine's error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every mutating call fails with `DbError::WriteRejected`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::WriteRejected("writes are disabled".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, DbError> {
        self.state
            .lock()
            .map_err(|_| DbError::WriteRejected("memory store lock poisoned".to_string()))
    }

    fn build_symbol(new_symbol: &NewIndexedSymbol) -> IndexedSymbol {
        let now = Utc::now();
        IndexedSymbol {
            id: Uuid::new_v4(),
            symbol: new_symbol.symbol.clone(),
            locked: new_symbol.locked,
            desired_percentage: new_symbol.desired_percentage,
            current_percentage: Decimal::ZERO,
            current_price: new_symbol.current_price,
            amount: 0,
            last_order_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_update(state: &mut MemoryState, symbol: &IndexedSymbol) -> Result<IndexedSymbol, DbError> {
        if symbol.amount < 0 {
            return Err(DbError::WriteRejected(format!(
                "amount for {} cannot be negative",
                symbol.symbol
            )));
        }
        let existing = state
            .symbols
            .iter_mut()
            .find(|s| s.id == symbol.id)
            .ok_or(DbError::NotFound)?;
        existing.locked = symbol.locked;
        existing.desired_percentage = symbol.desired_percentage;
        existing.current_percentage = symbol.current_percentage;
        existing.current_price = symbol.current_price;
        existing.amount = symbol.amount;
        existing.last_order_id = symbol.last_order_id.clone();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn ensure_configuration(&self, defaults: &ConfigDefaults) -> Result<bool, DbError> {
        self.check_writable()?;
        let mut state = self.lock()?;
        if !state.configs.is_empty() {
            return Ok(false);
        }

        state.configs.push(RebalanceConfig {
            id: Uuid::new_v4(),
            active: false,
            rebalance_threshold: defaults.rebalance_threshold,
            order_timeout_secs: defaults.order_timeout_secs,
            rebalance_frequency_secs: defaults.rebalance_frequency_secs,
            starting_balance: defaults.starting_balance,
            floating_percentage: Decimal::ZERO,
            created_at: Utc::now(),
        });

        if !state.symbols.iter().any(|s| s.symbol == CASH_SYMBOL) {
            let cash = Self::build_symbol(&NewIndexedSymbol {
                symbol: CASH_SYMBOL.to_string(),
                locked: false,
                desired_percentage: Decimal::ONE_HUNDRED,
                current_price: Decimal::ZERO,
            });
            state.symbols.push(cash);
        }
        Ok(true)
    }

    async fn get_configuration(&self) -> Result<RebalanceConfig, DbError> {
        let state = self.lock()?;
        state.configs.last().cloned().ok_or(DbError::NotFound)
    }

    async fn update_configuration(&self, config: &RebalanceConfig) -> Result<RebalanceConfig, DbError> {
        self.check_writable()?;
        let mut state = self.lock()?;
        let latest = state.configs.last_mut().ok_or(DbError::NotFound)?;
        latest.active = config.active;
        latest.rebalance_threshold = config.rebalance_threshold;
        latest.order_timeout_secs = config.order_timeout_secs;
        latest.rebalance_frequency_secs = config.rebalance_frequency_secs;
        latest.starting_balance = config.starting_balance;
        latest.floating_percentage = config.floating_percentage;
        Ok(latest.clone())
    }

    async fn get_all_indexed_symbols(&self) -> Result<Vec<IndexedSymbol>, DbError> {
        Ok(self.lock()?.symbols.clone())
    }

    async fn get_indexed_symbol_by_id(&self, id: Uuid) -> Result<IndexedSymbol, DbError> {
        let state = self.lock()?;
        state
            .symbols
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn get_indexed_symbol_by_symbol(&self, symbol: &str) -> Result<Option<IndexedSymbol>, DbError> {
        let state = self.lock()?;
        Ok(state.symbols.iter().find(|s| s.symbol == symbol).cloned())
    }

    async fn create_indexed_symbol(&self, new_symbol: &NewIndexedSymbol) -> Result<IndexedSymbol, DbError> {
        self.check_writable()?;
        let mut state = self.lock()?;
        if state.symbols.iter().any(|s| s.symbol == new_symbol.symbol) {
            return Err(DbError::Duplicate(new_symbol.symbol.clone()));
        }
        let created = Self::build_symbol(new_symbol);
        state.symbols.push(created.clone());
        Ok(created)
    }

    async fn update_indexed_symbol(&self, symbol: &IndexedSymbol) -> Result<IndexedSymbol, DbError> {
        self.check_writable()?;
        let mut state = self.lock()?;
        Self::apply_update(&mut state, symbol)
    }

    async fn insert_with_adjustments(
        &self,
        adjusted: &[IndexedSymbol],
        new_symbol: &NewIndexedSymbol,
    ) -> Result<IndexedSymbol, DbError> {
        self.check_writable()?;
        let mut state = self.lock()?;
        if state.symbols.iter().any(|s| s.symbol == new_symbol.symbol) {
            return Err(DbError::Duplicate(new_symbol.symbol.clone()));
        }

        // Stage on a copy so a failed update leaves nothing behind.
        let mut staged = MemoryState {
            symbols: state.symbols.clone(),
            configs: Vec::new(),
        };
        for symbol in adjusted {
            Self::apply_update(&mut staged, symbol)?;
        }
        let created = Self::build_symbol(new_symbol);
        staged.symbols.push(created.clone());

        state.symbols = staged.symbols;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn defaults() -> ConfigDefaults {
        ConfigDefaults {
            rebalance_threshold: dec!(1),
            order_timeout_secs: 10,
            rebalance_frequency_secs: 60,
            starting_balance: dec!(100000),
        }
    }

    #[tokio::test]
    async fn ensure_configuration_seeds_cash_once() {
        let store = MemoryStore::new();
        assert!(store.ensure_configuration(&defaults()).await.unwrap());
        assert!(!store.ensure_configuration(&defaults()).await.unwrap());

        let symbols = store.get_all_indexed_symbols().await.unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].symbol, CASH_SYMBOL);
        assert_eq!(symbols[0].desired_percentage, dec!(100));

        let config = store.get_configuration().await.unwrap();
        assert!(!config.active);
        assert_eq!(config.floating_percentage, Decimal::ZERO);
    }

    #[tokio::test]
    async fn duplicate_symbols_are_rejected() {
        let store = MemoryStore::new();
        let new_symbol = NewIndexedSymbol {
            symbol: "AAPL".to_string(),
            locked: false,
            desired_percentage: dec!(10),
            current_price: dec!(150),
        };
        store.create_indexed_symbol(&new_symbol).await.unwrap();
        assert!(matches!(
            store.create_indexed_symbol(&new_symbol).await,
            Err(DbError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn failed_adjustment_leaves_state_untouched() {
        let store = MemoryStore::new();
        store.ensure_configuration(&defaults()).await.unwrap();
        let mut cash = store.get_indexed_symbol_by_symbol(CASH_SYMBOL).await.unwrap().unwrap();
        cash.desired_percentage = dec!(70);

        let mut ghost = cash.clone();
        ghost.id = Uuid::new_v4();

        let new_symbol = NewIndexedSymbol {
            symbol: "AAPL".to_string(),
            locked: false,
            desired_percentage: dec!(30),
            current_price: dec!(150),
        };
        let result = store.insert_with_adjustments(&[cash, ghost], &new_symbol).await;
        assert!(matches!(result, Err(DbError::NotFound)));

        let symbols = store.get_all_indexed_symbols().await.unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].desired_percentage, dec!(100));
    }

    #[tokio::test]
    async fn negative_amounts_are_rejected() {
        let store = MemoryStore::new();
        store.ensure_configuration(&defaults()).await.unwrap();
        let mut cash = store.get_indexed_symbol_by_symbol(CASH_SYMBOL).await.unwrap().unwrap();
        cash.amount = -1;
        assert!(store.update_indexed_symbol(&cash).await.is_err());
    }
}
