use async_trait::async_trait;
use core_types::{OrderRequest, OrderStatus};
use rust_decimal::Decimal;

pub mod alpaca;
pub mod error;
pub mod paper;
pub mod responses;

// --- Public API ---
pub use alpaca::AlpacaClient;
pub use error::ApiError;
pub use paper::{FillBehaviour, PaperClient, PaperOrder};

/// Acknowledgement that the broker accepted an order for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
    pub status: OrderStatus,
}

/// The capability set every market adapter provides.
///
/// The rebalancing core only ever talks to this trait, so a live broker, a
/// paper account or the in-process simulation can be swapped without touching
/// it. Connection and credentials are configured through `&mut self` before the
/// adapter is shared; everything after that is `&self`.
#[async_trait]
pub trait MarketAccess: Send + Sync {
    /// Points the adapter at a trading endpoint.
    fn connect(&mut self, endpoint: &str) -> Result<(), ApiError>;

    /// Installs the credentials the adapter authenticates with.
    fn set_credentials(&mut self, credentials: &[String]) -> Result<(), ApiError>;

    /// Returns whether the broker accepts the configured credentials.
    async fn validate_credentials(&self) -> Result<bool, ApiError>;

    /// Total account value in the account currency.
    async fn get_account_value(&self) -> Result<Decimal, ApiError>;

    /// Mid of the latest bid/ask, rounded to 3 decimal places.
    async fn get_symbol_quote_price(&self, symbol: &str) -> Result<Decimal, ApiError>;

    /// Whether `symbol` exists and can be traded.
    async fn check_if_symbol_is_valid(&self, symbol: &str) -> Result<bool, ApiError>;

    /// Submits a market order and returns without waiting for a fill.
    async fn place_market_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError>;

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, ApiError>;

    async fn cancel_order(&self, order_id: &str) -> Result<(), ApiError>;
}
