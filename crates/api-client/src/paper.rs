use crate::error::ApiError;
use crate::{MarketAccess, OrderAck};
use async_trait::async_trait;
use core_types::math::round_price;
use core_types::{OrderRequest, OrderSide, OrderStatus};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// How the simulated market treats newly placed orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillBehaviour {
    /// Filled on the first status poll.
    #[default]
    Immediate,
    /// Pending for `n` polls, filled afterwards.
    AfterPolls(u32),
    Reject,
    /// Stays pending forever.
    Never,
    /// Canceled by the venue on the first poll.
    Cancel,
}

/// An order as recorded by the simulated market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperOrder {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
    pub status: OrderStatus,
    behaviour: FillBehaviour,
    polls_remaining: u32,
}

#[derive(Debug, Default)]
struct PaperState {
    quotes: HashMap<String, Decimal>,
    failing_quotes: HashSet<String>,
    tradable: HashSet<String>,
    account_value: Decimal,
    fill_behaviour: FillBehaviour,
    symbol_behaviour: HashMap<String, FillBehaviour>,
    orders: Vec<PaperOrder>,
    endpoint: String,
}

/// An in-process market used for paper sessions and tests.
///
/// Every symbol with a quote is tradable. Orders never move prices or the
/// account value; they only go through the configured lifecycle.
#[derive(Debug, Default)]
pub struct PaperClient {
    state: Mutex<PaperState>,
}

impl PaperClient {
    pub fn new(account_value: Decimal) -> Self {
        let client = Self::default();
        client.lock().account_value = account_value;
        client
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        // A poisoned lock only means another test thread panicked mid-update.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_quote(self, symbol: &str, price: Decimal) -> Self {
        self.set_quote(symbol, price);
        self
    }

    pub fn set_quote(&self, symbol: &str, price: Decimal) {
        let mut state = self.lock();
        state.quotes.insert(symbol.to_string(), round_price(price));
        state.tradable.insert(symbol.to_string());
    }

    /// Makes `symbol` tradable without giving it a quote.
    pub fn add_tradable(&self, symbol: &str) {
        self.lock().tradable.insert(symbol.to_string());
    }

    /// Quote requests for `symbol` fail until cleared.
    pub fn fail_quotes_for(&self, symbol: &str, fail: bool) {
        let mut state = self.lock();
        if fail {
            state.failing_quotes.insert(symbol.to_string());
        } else {
            state.failing_quotes.remove(symbol);
        }
    }

    pub fn set_account_value(&self, value: Decimal) {
        self.lock().account_value = value;
    }

    pub fn set_fill_behaviour(&self, behaviour: FillBehaviour) {
        self.lock().fill_behaviour = behaviour;
    }

    /// Overrides the fill behaviour for orders in one symbol.
    pub fn set_symbol_fill_behaviour(&self, symbol: &str, behaviour: FillBehaviour) {
        self.lock().symbol_behaviour.insert(symbol.to_string(), behaviour);
    }

    /// Every order placed so far, oldest first.
    pub fn orders(&self) -> Vec<PaperOrder> {
        self.lock().orders.clone()
    }

    pub fn endpoint(&self) -> String {
        self.lock().endpoint.clone()
    }
}

#[async_trait]
impl MarketAccess for PaperClient {
    fn connect(&mut self, endpoint: &str) -> Result<(), ApiError> {
        self.lock().endpoint = endpoint.to_string();
        Ok(())
    }

    fn set_credentials(&mut self, _credentials: &[String]) -> Result<(), ApiError> {
        Ok(())
    }

    async fn validate_credentials(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn get_account_value(&self) -> Result<Decimal, ApiError> {
        Ok(self.lock().account_value)
    }

    async fn get_symbol_quote_price(&self, symbol: &str) -> Result<Decimal, ApiError> {
        let state = self.lock();
        if state.failing_quotes.contains(symbol) {
            return Err(ApiError::QuoteUnavailable(symbol.to_string()));
        }
        state
            .quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| ApiError::QuoteUnavailable(symbol.to_string()))
    }

    async fn check_if_symbol_is_valid(&self, symbol: &str) -> Result<bool, ApiError> {
        Ok(self.lock().tradable.contains(symbol))
    }

    async fn place_market_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError> {
        let mut state = self.lock();
        if !state.tradable.contains(&order.symbol) {
            return Err(ApiError::Broker {
                status: 422,
                message: format!("asset {} is not tradable", order.symbol),
            });
        }
        if order.quantity <= 0 {
            return Err(ApiError::Broker {
                status: 422,
                message: "qty must be > 0".to_string(),
            });
        }

        let behaviour = state
            .symbol_behaviour
            .get(&order.symbol)
            .copied()
            .unwrap_or(state.fill_behaviour);
        let polls_remaining = match behaviour {
            FillBehaviour::AfterPolls(n) => n,
            _ => 0,
        };
        let placed = PaperOrder {
            order_id: Uuid::new_v4().to_string(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            status: OrderStatus::Pending,
            behaviour,
            polls_remaining,
        };
        let ack = OrderAck {
            order_id: placed.order_id.clone(),
            status: placed.status,
        };
        state.orders.push(placed);

        tracing::debug!(
            symbol = %order.symbol,
            order_id = %ack.order_id,
            side = %order.side,
            quantity = order.quantity,
            "Paper order placed."
        );
        Ok(ack)
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, ApiError> {
        let mut state = self.lock();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| ApiError::UnknownOrder(order_id.to_string()))?;

        if order.status.is_terminal() {
            return Ok(order.status);
        }
        order.status = match order.behaviour {
            FillBehaviour::Immediate => OrderStatus::Filled,
            FillBehaviour::Reject => OrderStatus::Rejected,
            FillBehaviour::Cancel => OrderStatus::Canceled,
            FillBehaviour::Never => OrderStatus::Pending,
            FillBehaviour::AfterPolls(_) => {
                if order.polls_remaining == 0 {
                    OrderStatus::Filled
                } else {
                    order.polls_remaining -= 1;
                    OrderStatus::Pending
                }
            }
        };
        Ok(order.status)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| ApiError::UnknownOrder(order_id.to_string()))?;
        if order.status.is_terminal() {
            return Err(ApiError::Broker {
                status: 422,
                message: format!("order {} is already {:?}", order_id, order.status),
            });
        }
        order.status = OrderStatus::Canceled;
        Ok(())
    }
}
