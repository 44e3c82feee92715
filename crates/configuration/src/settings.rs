use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub paper: PaperSettings,
    #[serde(default)]
    pub rebalance: RebalanceDefaults,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which state store backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    /// Process-local state, lost on exit. Useful for paper sessions and tests.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: DatabaseBackend,
    /// Falls back to the `DATABASE_URL` environment variable when empty.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    /// The configured URL, or `DATABASE_URL` from the environment.
    pub fn resolved_url(&self) -> Option<String> {
        if !self.url.is_empty() {
            return Some(self.url.clone());
        }
        std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty())
    }
}

/// The market adapter the engine trades through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    /// Alpaca's REST API (live or paper endpoint, depending on `endpoint`).
    Alpaca,
    /// The in-process simulated market.
    #[default]
    Paper,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    #[serde(default)]
    pub kind: BrokerKind,
    /// Trading API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Market data API base URL.
    #[serde(default = "default_data_endpoint")]
    pub data_endpoint: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
    /// Interval between order status polls while waiting for a fill.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            kind: BrokerKind::default(),
            endpoint: default_endpoint(),
            data_endpoint: default_data_endpoint(),
            key: String::new(),
            secret: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Seed data for the simulated market.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperSettings {
    #[serde(default = "default_starting_balance")]
    pub account_value: Decimal,
    /// Mid prices keyed by symbol.
    #[serde(default)]
    pub quotes: HashMap<String, Decimal>,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            account_value: default_starting_balance(),
            quotes: HashMap::new(),
        }
    }
}

/// Values written into the configuration record the first time it is created.
#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceDefaults {
    #[serde(default = "default_threshold")]
    pub threshold: Decimal,
    #[serde(default = "default_order_timeout_secs")]
    pub order_timeout_secs: i64,
    #[serde(default = "default_frequency_secs")]
    pub frequency_secs: i64,
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
}

impl Default for RebalanceDefaults {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            order_timeout_secs: default_order_timeout_secs(),
            frequency_secs: default_frequency_secs(),
            starting_balance: default_starting_balance(),
        }
    }
}

/// How capacity is taken from unlocked symbols when a new symbol needs room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedistributionKind {
    #[default]
    EqualSplit,
    ProRata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub redistribution: RedistributionKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl Settings {
    /// Rejects combinations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rebalance = &self.rebalance;
        if rebalance.frequency_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "rebalance.frequency_secs must be greater than 0".to_string(),
            ));
        }
        if rebalance.order_timeout_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "rebalance.order_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if rebalance.threshold < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "rebalance.threshold cannot be negative".to_string(),
            ));
        }
        if rebalance.starting_balance <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "rebalance.starting_balance must be greater than 0".to_string(),
            ));
        }
        if self.broker.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "broker.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.broker.kind == BrokerKind::Alpaca
            && (self.broker.key.is_empty() || self.broker.secret.is_empty())
        {
            return Err(ConfigError::ValidationError(
                "broker.key and broker.secret are required for the alpaca broker".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_endpoint() -> String {
    "https://paper-api.alpaca.markets".to_string()
}

fn default_data_endpoint() -> String {
    "https://data.alpaca.markets".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_threshold() -> Decimal {
    dec!(1)
}

fn default_order_timeout_secs() -> i64 {
    10
}

fn default_frequency_secs() -> i64 {
    60
}

fn default_starting_balance() -> Decimal {
    dec!(100000)
}

fn default_log_level() -> String {
    "info".to_string()
}
