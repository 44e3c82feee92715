//! Interactive line shell. The rebalance loop keeps running in the background
//! while commands execute; the store lock serializes their writes.

use crate::app::App;
use rust_decimal::Decimal;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    IndexAdd {
        symbol: String,
        percentage: Decimal,
        locked: bool,
    },
    IndexGenerate,
    IndexStart,
    IndexStop,
    IndexStatus,
    ShowIndex,
    ShowStats,
    ShowConfig,
    Help,
    Exit,
}

impl ShellCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts.first().map(|s| s.to_lowercase());

        let command = match cmd.as_deref() {
            None => return Ok(None),
            Some("index_add") => Self::parse_add(&parts[1..])?,
            Some("index_gen") => Self::IndexGenerate,
            Some("index_start") => Self::IndexStart,
            Some("index_stop") => Self::IndexStop,
            Some("index_status") => Self::IndexStatus,
            Some("show_index") => Self::ShowIndex,
            Some("show_stats") => Self::ShowStats,
            Some("show_config") => Self::ShowConfig,
            Some("help" | "h" | "?") => Self::Help,
            Some("exit" | "quit" | "q") => Self::Exit,
            Some(other) => {
                return Err(format!("Unknown command: '{other}'. Type 'help' for commands."));
            }
        };
        Ok(Some(command))
    }

    fn parse_add(args: &[&str]) -> Result<Self, String> {
        const USAGE: &str = "Usage: index_add <symbol> <percentage> [locked]";
        let (symbol, percentage) = match args {
            [symbol, percentage] | [symbol, percentage, _] => (symbol, percentage),
            _ => return Err(USAGE.to_string()),
        };
        let percentage: Decimal = percentage
            .parse()
            .map_err(|_| format!("Invalid percentage: '{percentage}'"))?;
        let locked = match args.get(2).map(|s| s.to_lowercase()).as_deref() {
            None => false,
            Some("locked" | "lock" | "true") => true,
            Some(other) => return Err(format!("Unexpected argument: '{other}'. {USAGE}")),
        };
        Ok(Self::IndexAdd {
            symbol: symbol.to_string(),
            percentage,
            locked,
        })
    }
}

pub async fn run(app: &App) -> anyhow::Result<()> {
    println!("Rebalancer shell");
    println!("Type 'help' for commands, 'exit' to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("rebalancer> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match ShellCommand::parse(&line) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Exit)) => break,
            Ok(Some(ShellCommand::Help)) => print_help(),
            Ok(Some(command)) => {
                if let Err(e) = execute(app, command).await {
                    println!("Error: {e:#}");
                }
            }
            Err(message) => println!("{message}"),
        }
    }

    if app.control.stop().await.is_ok() {
        println!("Rebalance loop stopped.");
    }
    println!("Goodbye!");
    Ok(())
}

async fn execute(app: &App, command: ShellCommand) -> anyhow::Result<()> {
    match command {
        ShellCommand::IndexAdd {
            symbol,
            percentage,
            locked,
        } => {
            let added = app.add_symbol(&symbol, percentage, locked).await?;
            println!(
                "Added {} at {}% (price {}).",
                added.symbol, added.desired_percentage, added.current_price
            );
        }
        ShellCommand::IndexGenerate => {
            let summary = app.generate(|_, _| {}).await?;
            for funded in &summary.funded {
                println!("Bought {} {} at {}.", funded.units, funded.symbol, funded.price);
            }
            for skipped in &summary.skipped {
                println!("Skipped {skipped}.");
            }
        }
        ShellCommand::IndexStart => {
            app.control.start().await?;
            println!("Rebalance loop started.");
        }
        ShellCommand::IndexStop => {
            app.control.stop().await?;
            println!("Rebalance loop stopped.");
        }
        ShellCommand::IndexStatus => {
            let status = app.control.status().await?;
            println!("{:?}, {} cycles completed.", status.state, status.cycles_completed);
        }
        ShellCommand::ShowIndex => println!("{}", app.index_report().await?),
        ShellCommand::ShowStats => println!("{}", app.stats_report().await?),
        ShellCommand::ShowConfig => println!("{}", app.config_report().await?),
        ShellCommand::Help | ShellCommand::Exit => {}
    }
    Ok(())
}

fn print_help() {
    println!(
        "
Commands:
  index_add <symbol> <pct> [locked]  Add a symbol to the index
  index_gen                          Buy every symbol once and activate the index
  index_start                        Start the rebalance loop
  index_stop                         Stop the rebalance loop after the current cycle
  index_status                       Show the loop state
  show_index                         Holdings and allocations
  show_stats                         Account value and index size
  show_config                        Rebalance configuration
  help                               Show this help
  exit                               Stop the loop and quit
"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_index_add() {
        assert_eq!(
            ShellCommand::parse("index_add aapl 12.5").unwrap(),
            Some(ShellCommand::IndexAdd {
                symbol: "aapl".to_string(),
                percentage: dec!(12.5),
                locked: false,
            })
        );
        assert_eq!(
            ShellCommand::parse("  INDEX_ADD MSFT 20 locked ").unwrap(),
            Some(ShellCommand::IndexAdd {
                symbol: "MSFT".to_string(),
                percentage: dec!(20),
                locked: true,
            })
        );
    }

    #[test]
    fn rejects_malformed_index_add() {
        assert!(ShellCommand::parse("index_add").is_err());
        assert!(ShellCommand::parse("index_add AAPL").is_err());
        assert!(ShellCommand::parse("index_add AAPL ten").is_err());
        assert!(ShellCommand::parse("index_add AAPL 10 maybe").is_err());
        assert!(ShellCommand::parse("index_add AAPL 10 locked extra").is_err());
    }

    #[test]
    fn parses_the_remaining_commands() {
        let cases = [
            ("index_gen", ShellCommand::IndexGenerate),
            ("index_start", ShellCommand::IndexStart),
            ("index_stop", ShellCommand::IndexStop),
            ("index_status", ShellCommand::IndexStatus),
            ("show_index", ShellCommand::ShowIndex),
            ("show_stats", ShellCommand::ShowStats),
            ("show_config", ShellCommand::ShowConfig),
            ("help", ShellCommand::Help),
            ("exit", ShellCommand::Exit),
        ];
        for (line, expected) in cases {
            assert_eq!(ShellCommand::parse(line).unwrap(), Some(expected));
        }
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(ShellCommand::parse("   ").unwrap(), None);
        let err = ShellCommand::parse("rebalance now").unwrap_err();
        assert!(err.contains("rebalance"));
    }
}
