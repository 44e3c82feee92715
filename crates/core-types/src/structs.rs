use crate::enums::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::time::Duration;
use uuid::Uuid;

/// One tradable asset participating in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct IndexedSymbol {
    pub id: Uuid,
    /// Upper-cased ticker, unique within the index and never changed after creation.
    pub symbol: String,
    /// Locked symbols keep their desired percentage when capacity is redistributed.
    pub locked: bool,
    pub desired_percentage: Decimal,
    pub current_percentage: Decimal,
    /// Last observed mid quote.
    pub current_price: Decimal,
    /// Whole units held. Never negative.
    pub amount: i64,
    pub last_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexedSymbol {
    /// Market value of the holding at the last observed price.
    pub fn holding_value(&self) -> Decimal {
        crate::math::round_usd(self.current_price * Decimal::from(self.amount))
    }

    pub fn is_cash(&self) -> bool {
        self.symbol == crate::math::CASH_SYMBOL
    }
}

/// The insertable subset of an `IndexedSymbol`; the store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIndexedSymbol {
    pub symbol: String,
    pub locked: bool,
    pub desired_percentage: Decimal,
    pub current_price: Decimal,
}

/// The singleton rebalancing policy and floating-budget accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RebalanceConfig {
    pub id: Uuid,
    /// Set once the index has been funded; gates the control loop.
    pub active: bool,
    /// Drift, in percentage points, that has to be exceeded before trading.
    pub rebalance_threshold: Decimal,
    pub order_timeout_secs: i64,
    pub rebalance_frequency_secs: i64,
    pub starting_balance: Decimal,
    /// Percentage points freed by sells and not yet spent on buys.
    pub floating_percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

impl RebalanceConfig {
    /// Upper bound on the wait for a single order to fill. Never shorter than one second.
    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.order_timeout_secs).unwrap_or(0).max(1))
    }

    /// Pause between two rebalance cycles. Never shorter than one second.
    pub fn rebalance_frequency(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.rebalance_frequency_secs).unwrap_or(0).max(1))
    }
}

/// A request to trade a whole number of units at market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: OrderSide, quantity: i64) -> Self {
        Self {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            quantity,
        }
    }
}

/// Receipt for an order that reached the `filled` state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
    pub filled_at: DateTime<Utc>,
}
