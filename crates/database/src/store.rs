use crate::error::DbError;
use async_trait::async_trait;
use core_types::{IndexedSymbol, NewIndexedSymbol, RebalanceConfig};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Seed values for the configuration record created on first start.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDefaults {
    pub rebalance_threshold: Decimal,
    pub order_timeout_secs: i64,
    pub rebalance_frequency_secs: i64,
    pub starting_balance: Decimal,
}

/// Everything the allocation engine needs from persistent state.
///
/// Implementations only guarantee atomicity of a single call. Read-modify-write
/// sequences spanning several calls are serialized by the engine.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Creates the configuration record and the cash symbol at 100% if no
    /// configuration exists yet. Returns `true` when anything was created.
    async fn ensure_configuration(&self, defaults: &ConfigDefaults) -> Result<bool, DbError>;

    /// The most recently created configuration record.
    async fn get_configuration(&self) -> Result<RebalanceConfig, DbError>;

    /// Overwrites the mutable fields of the most recent configuration record.
    async fn update_configuration(&self, config: &RebalanceConfig) -> Result<RebalanceConfig, DbError>;

    async fn get_all_indexed_symbols(&self) -> Result<Vec<IndexedSymbol>, DbError>;

    async fn get_indexed_symbol_by_id(&self, id: Uuid) -> Result<IndexedSymbol, DbError>;

    async fn get_indexed_symbol_by_symbol(&self, symbol: &str) -> Result<Option<IndexedSymbol>, DbError>;

    async fn is_symbol_indexed(&self, symbol: &str) -> Result<bool, DbError> {
        Ok(self.get_indexed_symbol_by_symbol(symbol).await?.is_some())
    }

    async fn create_indexed_symbol(&self, new_symbol: &NewIndexedSymbol) -> Result<IndexedSymbol, DbError>;

    /// Overwrites the mutable fields of an existing symbol, matched by id.
    async fn update_indexed_symbol(&self, symbol: &IndexedSymbol) -> Result<IndexedSymbol, DbError>;

    /// Applies `adjusted` and inserts `new_symbol` as one unit: either every
    /// write lands or none does.
    async fn insert_with_adjustments(
        &self,
        adjusted: &[IndexedSymbol],
        new_symbol: &NewIndexedSymbol,
    ) -> Result<IndexedSymbol, DbError>;
}
