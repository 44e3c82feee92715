use clap::{Args, Parser, Subcommand};
use configuration::BrokerKind;
use rust_decimal::Decimal;

/// Keeps a brokerage account allocated according to a target index.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file. Missing files fall back to defaults.
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Overrides the broker selected in the configuration file.
    #[arg(long, value_enum)]
    pub broker: Option<BrokerKind>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the symbols that make up the index.
    #[command(subcommand)]
    Index(IndexCommand),
    /// Start the rebalance loop and keep it running until Ctrl-C.
    Run,
    /// Print read-only reports.
    #[command(subcommand)]
    Show(ShowCommand),
    /// Interactive shell; the rebalance loop runs in the background.
    Shell,
}

#[derive(Subcommand)]
pub enum IndexCommand {
    /// Add a symbol with a target percentage, taking room from unlocked symbols.
    Add(AddArgs),
    /// Buy every indexed symbol once and activate the index.
    Generate,
}

#[derive(Args)]
pub struct AddArgs {
    /// Ticker to add (e.g. "AAPL").
    pub symbol: String,

    /// Target allocation in percent, greater than 0 and at most 100.
    pub percentage: Decimal,

    /// Exclude the symbol from future redistributions.
    #[arg(long)]
    pub locked: bool,
}

#[derive(Subcommand)]
pub enum ShowCommand {
    /// Holdings and allocation of every indexed symbol.
    Index,
    /// Account value and index size.
    Stats,
    /// The stored rebalance configuration.
    Config,
}
