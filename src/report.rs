//! Read-only tables for the `show` commands.

use chrono::SecondsFormat;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};
use core_types::{IndexedSymbol, RebalanceConfig};
use rust_decimal::Decimal;

fn base_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table
}

fn numeric(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

pub fn index_table(symbols: &[IndexedSymbol]) -> Table {
    let mut table = base_table();
    table.set_header(vec![
        "Symbol",
        "Amount",
        "Current USD Value",
        "Current Price",
        "Locked",
        "Desired %",
        "Current %",
    ]);
    for symbol in symbols {
        table.add_row(vec![
            Cell::new(&symbol.symbol),
            numeric(symbol.amount),
            numeric(symbol.holding_value()),
            numeric(symbol.current_price),
            Cell::new(if symbol.locked { "yes" } else { "no" }),
            numeric(symbol.desired_percentage),
            numeric(symbol.current_percentage),
        ]);
    }
    table
}

pub fn stats_table(account_value: Decimal, indexed: usize) -> Table {
    let mut table = base_table();
    table.set_header(vec!["Account Value", "# Indexed"]);
    table.add_row(vec![numeric(account_value), numeric(indexed)]);
    table
}

pub fn config_table(config: &RebalanceConfig) -> Table {
    let mut table = base_table();
    table.set_header(vec!["Field", "Value"]);
    let rows = [
        ("Active", config.active.to_string()),
        ("Rebalance Threshold", config.rebalance_threshold.to_string()),
        ("Order Timeout (s)", config.order_timeout_secs.to_string()),
        ("Rebalance Frequency (s)", config.rebalance_frequency_secs.to_string()),
        ("Starting Balance", config.starting_balance.to_string()),
        ("Floating %", config.floating_percentage.to_string()),
        (
            "Created",
            config.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn holding(symbol: &str, amount: i64, price: Decimal, locked: bool) -> IndexedSymbol {
        IndexedSymbol {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            locked,
            desired_percentage: dec!(30),
            current_percentage: dec!(31.5),
            current_price: price,
            amount,
            last_order_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn index_table_lists_every_symbol_with_its_value() {
        let rendered = index_table(&[
            holding("AAPL", 200, dec!(150), false),
            holding("MSFT", 10, dec!(300.5), true),
        ])
        .to_string();

        assert!(rendered.contains("Current USD Value"));
        assert!(rendered.contains("AAPL"));
        assert!(rendered.contains("30000"));
        assert!(rendered.contains("3005"));
        assert!(rendered.contains("yes"));
        assert!(rendered.contains("31.5"));
    }

    #[test]
    fn stats_table_shows_account_value_and_count() {
        let rendered = stats_table(dec!(100250.75), 4).to_string();
        assert!(rendered.contains("# Indexed"));
        assert!(rendered.contains("100250.75"));
        assert!(rendered.contains('4'));
    }

    #[test]
    fn config_table_includes_floating_percentage() {
        let config = RebalanceConfig {
            id: Uuid::new_v4(),
            active: true,
            rebalance_threshold: dec!(1),
            order_timeout_secs: 10,
            rebalance_frequency_secs: 60,
            starting_balance: dec!(100000),
            floating_percentage: dec!(2.25),
            created_at: Utc::now(),
        };
        let rendered = config_table(&config).to_string();
        assert!(rendered.contains("Floating %"));
        assert!(rendered.contains("2.25"));
        assert!(rendered.contains("true"));
    }
}
