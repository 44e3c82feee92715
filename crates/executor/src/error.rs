use api_client::ApiError;
use core_types::OrderStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Order for {quantity} units of {symbol} was rejected by the broker")]
    OrderRejected { symbol: String, quantity: i64 },

    #[error("Order for {symbol} ended as {status:?} without filling")]
    OrderCancelled { symbol: String, status: OrderStatus },

    #[error("Order {order_id} for {symbol} did not fill within {timeout:?}")]
    FillTimeout {
        symbol: String,
        order_id: String,
        timeout: Duration,
    },

    #[error("Order quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}
