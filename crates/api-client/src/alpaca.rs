use crate::error::ApiError;
use crate::responses::{
    AccountResponse, ApiErrorResponse, AssetResponse, LatestQuoteResponse, NewOrderBody,
    OrderResponse,
};
use crate::{MarketAccess, OrderAck};
use async_trait::async_trait;
use core_types::math::mid_price;
use core_types::{OrderRequest, OrderStatus};
use reqwest::{RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

/// A concrete implementation of `MarketAccess` for Alpaca's REST API.
///
/// The same client serves live and paper accounts; only the trading endpoint differs.
#[derive(Clone)]
pub struct AlpacaClient {
    client: reqwest::Client,
    base_url: String,
    data_url: String,
    api_key: String,
    api_secret: String,
}

impl AlpacaClient {
    pub fn new(data_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: String::new(),
            data_url: data_url.trim_end_matches('/').to_string(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(KEY_HEADER, &self.api_key)
            .header(SECRET_HEADER, &self.api_secret)
    }

    fn trading_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a response into `T` on success, or into `ApiError::Broker` using
    /// the broker's error body when it can be parsed.
    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let message = serde_json::from_str::<ApiErrorResponse>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            Err(ApiError::Broker {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn fetch_account(&self) -> Result<AccountResponse, ApiError> {
        let response = self
            .authorized(self.client.get(self.trading_url("/v2/account")))
            .send()
            .await?;
        Self::parse(response).await
    }
}

#[async_trait]
impl MarketAccess for AlpacaClient {
    fn connect(&mut self, endpoint: &str) -> Result<(), ApiError> {
        let endpoint = endpoint.trim_end_matches('/');
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ApiError::InvalidData(format!("'{}' is not an http(s) URL", endpoint)));
        }
        self.base_url = endpoint.to_string();
        Ok(())
    }

    fn set_credentials(&mut self, credentials: &[String]) -> Result<(), ApiError> {
        match credentials {
            [key, secret] => {
                self.api_key = key.clone();
                self.api_secret = secret.clone();
                Ok(())
            }
            _ => Err(ApiError::Credentials(
                "alpaca needs exactly two credentials: key and secret".to_string(),
            )),
        }
    }

    async fn validate_credentials(&self) -> Result<bool, ApiError> {
        match self.fetch_account().await {
            Ok(account) => {
                tracing::debug!(account = %account.id, status = %account.status, "Broker credentials accepted.");
                Ok(true)
            }
            Err(ApiError::Broker { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_account_value(&self) -> Result<Decimal, ApiError> {
        Ok(self.fetch_account().await?.portfolio_value)
    }

    async fn get_symbol_quote_price(&self, symbol: &str) -> Result<Decimal, ApiError> {
        let url = format!("{}/v2/stocks/{}/quotes/latest", self.data_url, symbol);
        let response = self.authorized(self.client.get(&url)).send().await?;
        let latest: LatestQuoteResponse = Self::parse(response).await?;

        if latest.quote.bid_price <= Decimal::ZERO || latest.quote.ask_price <= Decimal::ZERO {
            return Err(ApiError::QuoteUnavailable(latest.symbol));
        }
        Ok(mid_price(latest.quote.bid_price, latest.quote.ask_price))
    }

    async fn check_if_symbol_is_valid(&self, symbol: &str) -> Result<bool, ApiError> {
        let url = self.trading_url(&format!("/v2/assets/{}", symbol));
        let response = self.authorized(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let asset: AssetResponse = Self::parse(response).await?;
        Ok(asset.tradable && asset.status == "active")
    }

    async fn place_market_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError> {
        let body = NewOrderBody {
            symbol: &order.symbol,
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: "market",
            time_in_force: "gtc",
            client_order_id: order.client_order_id.to_string(),
        };
        let response = self
            .authorized(self.client.post(self.trading_url("/v2/orders")))
            .json(&body)
            .send()
            .await?;
        let placed: OrderResponse = Self::parse(response).await?;

        tracing::info!(symbol = %placed.symbol, order_id = %placed.id, side = %order.side, quantity = order.quantity, "Placed market order.");
        Ok(OrderAck {
            status: OrderStatus::from_broker(&placed.status),
            order_id: placed.id,
        })
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus, ApiError> {
        let url = self.trading_url(&format!("/v2/orders/{}", order_id));
        let response = self.authorized(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::UnknownOrder(order_id.to_string()));
        }
        let order: OrderResponse = Self::parse(response).await?;
        Ok(OrderStatus::from_broker(&order.status))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), ApiError> {
        let url = self.trading_url(&format!("/v2/orders/{}", order_id));
        let response = self.authorized(self.client.delete(&url)).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await?;
        Err(ApiError::Broker {
            status: status.as_u16(),
            message: text,
        })
    }
}
