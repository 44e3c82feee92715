use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Wire shapes of the Alpaca v2 REST API. Only the fields we read are declared.

/// `GET /v2/account`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub status: String,
    pub portfolio_value: Decimal,
}

/// `GET /v2/assets/{symbol}`
#[derive(Debug, Clone, Deserialize)]
pub struct AssetResponse {
    pub symbol: String,
    pub status: String,
    pub tradable: bool,
}

/// `GET /v2/stocks/{symbol}/quotes/latest`
#[derive(Debug, Clone, Deserialize)]
pub struct LatestQuoteResponse {
    pub symbol: String,
    pub quote: QuoteBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteBody {
    #[serde(rename = "bp")]
    pub bid_price: Decimal,
    #[serde(rename = "ap")]
    pub ask_price: Decimal,
}

/// Body of `POST /v2/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderBody<'a> {
    pub symbol: &'a str,
    pub qty: String,
    pub side: &'a str,
    #[serde(rename = "type")]
    pub order_type: &'a str,
    pub time_in_force: &'a str,
    pub client_order_id: String,
}

/// `POST /v2/orders` and `GET /v2/orders/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub filled_qty: Option<Decimal>,
}

/// Represents an error response from the Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}
