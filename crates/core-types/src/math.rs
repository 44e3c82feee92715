//! Fixed-point helpers shared by the allocation engine.
//!
//! Every value that is persisted goes through one of the `round_*` helpers so
//! that the same inputs always produce byte-identical records. All rounding is
//! half-away-from-zero (`Decimal::round_dp` alone would round half-to-even).

use crate::error::CoreError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// The symbol representing uninvested cash in the index.
pub const CASH_SYMBOL: &str = "USD";

/// Decimal places kept for desired/current percentages.
pub const PERCENTAGE_DP: u32 = 2;
/// Decimal places kept for quoted prices.
pub const PRICE_DP: u32 = 3;
/// Decimal places kept for currency values.
pub const USD_DP: u32 = 2;

pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn round_percentage(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENTAGE_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_DP, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_usd(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(USD_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `percent` percent of `number`.
pub fn percentage_of(number: Decimal, percent: Decimal) -> Decimal {
    number * percent / HUNDRED
}

/// Relative change from `old` to `new`, in percent. Zero when `old` is zero.
pub fn percentage_difference(old: Decimal, new: Decimal) -> Decimal {
    if old.is_zero() {
        return Decimal::ZERO;
    }
    (new - old) / old * HUNDRED
}

/// Mid point of a bid/ask pair, rounded to price precision.
pub fn mid_price(bid: Decimal, ask: Decimal) -> Decimal {
    round_price((bid + ask) / dec!(2))
}

/// Whole units purchasable (or sellable) for `value` at `price`, truncated toward zero.
pub fn whole_units(value: Decimal, price: Decimal) -> i64 {
    if price <= Decimal::ZERO {
        return 0;
    }
    (value / price).trunc().to_i64().unwrap_or(0)
}

/// Trims and upper-cases a ticker, rejecting anything that is not `[A-Z0-9.-]+`.
pub fn normalize_symbol(raw: &str) -> Result<String, CoreError> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(CoreError::InvalidInput("symbol".into(), "symbol is empty".into()));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(CoreError::InvalidInput(
            "symbol".into(),
            format!("'{}' contains unsupported characters", raw.trim()),
        ));
    }
    Ok(symbol)
}

/// Rounds a requested allocation and checks it lies in `(0, 100]`.
pub fn validate_percentage(value: Decimal) -> Result<Decimal, CoreError> {
    let rounded = round_percentage(value);
    if rounded <= Decimal::ZERO || rounded > HUNDRED {
        return Err(CoreError::InvalidInput(
            "percentage".into(),
            format!("{} is outside (0, 100]", value),
        ));
    }
    Ok(rounded)
}
