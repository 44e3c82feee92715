use crate::error::ExecutorError;
use api_client::MarketAccess;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Fill, OrderRequest, OrderSide, OrderStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// How often an open order is polled unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A generic trait for an execution gateway.
///
/// Calls block the caller until the order is terminal or `timeout` elapses;
/// the engine never has more than one order in flight.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Places `order` and waits for it to fill.
    async fn submit_and_await_fill(
        &self,
        order: &OrderRequest,
        timeout: Duration,
    ) -> Result<Fill, ExecutorError>;

    async fn fulfill_market_order_buy(
        &self,
        symbol: &str,
        quantity: i64,
        timeout: Duration,
    ) -> Result<Fill, ExecutorError> {
        let order = OrderRequest::market(symbol, OrderSide::Buy, quantity);
        self.submit_and_await_fill(&order, timeout).await
    }

    async fn fulfill_market_order_sell(
        &self,
        symbol: &str,
        quantity: i64,
        timeout: Duration,
    ) -> Result<Fill, ExecutorError> {
        let order = OrderRequest::market(symbol, OrderSide::Sell, quantity);
        self.submit_and_await_fill(&order, timeout).await
    }
}

/// The executor that routes orders through a `MarketAccess` adapter.
pub struct LiveExecutor {
    market: Arc<dyn MarketAccess>,
    poll_interval: Duration,
}

impl LiveExecutor {
    pub fn new(market: Arc<dyn MarketAccess>) -> Self {
        Self {
            market,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Polls until the broker reports a terminal state. Never returns an error:
    /// poll failures are logged and the next tick tries again.
    async fn await_terminal(&self, symbol: &str, order_id: &str) -> OrderStatus {
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.market.get_order_status(order_id).await {
                Ok(status) if status.is_terminal() => return status,
                Ok(status) => {
                    tracing::debug!(%symbol, %order_id, ?status, "Order still open.");
                }
                Err(e) => {
                    tracing::warn!(%symbol, %order_id, error = %e, "Failed to poll order status, retrying.");
                }
            }
        }
    }

    async fn cancel_after_timeout(&self, symbol: &str, order_id: &str) {
        match self.market.cancel_order(order_id).await {
            Ok(()) => tracing::warn!(%symbol, %order_id, "Canceled order that missed its fill deadline."),
            Err(e) => tracing::error!(
                %symbol,
                %order_id,
                error = %e,
                "Failed to cancel order that missed its fill deadline."
            ),
        }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    async fn submit_and_await_fill(
        &self,
        order: &OrderRequest,
        timeout: Duration,
    ) -> Result<Fill, ExecutorError> {
        if order.quantity <= 0 {
            return Err(ExecutorError::InvalidQuantity(order.quantity));
        }

        let ack = self.market.place_market_order(order).await?;
        tracing::info!(
            symbol = %order.symbol,
            order_id = %ack.order_id,
            side = %order.side,
            quantity = order.quantity,
            "Submitted market order, awaiting fill."
        );

        let status = if ack.status.is_terminal() {
            ack.status
        } else {
            match time::timeout(timeout, self.await_terminal(&order.symbol, &ack.order_id)).await {
                Ok(status) => status,
                Err(_) => {
                    self.cancel_after_timeout(&order.symbol, &ack.order_id).await;
                    return Err(ExecutorError::FillTimeout {
                        symbol: order.symbol.clone(),
                        order_id: ack.order_id,
                        timeout,
                    });
                }
            }
        };

        match status {
            OrderStatus::Filled => {
                tracing::info!(symbol = %order.symbol, order_id = %ack.order_id, "Order filled.");
                Ok(Fill {
                    order_id: ack.order_id,
                    symbol: order.symbol.clone(),
                    side: order.side,
                    quantity: order.quantity,
                    filled_at: Utc::now(),
                })
            }
            OrderStatus::Rejected => {
                tracing::error!(symbol = %order.symbol, order_id = %ack.order_id, "Order rejected.");
                Err(ExecutorError::OrderRejected {
                    symbol: order.symbol.clone(),
                    quantity: order.quantity,
                })
            }
            other => {
                tracing::error!(symbol = %order.symbol, order_id = %ack.order_id, status = ?other, "Order closed without filling.");
                Err(ExecutorError::OrderCancelled {
                    symbol: order.symbol.clone(),
                    status: other,
                })
            }
        }
    }
}
