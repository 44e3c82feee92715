use clap::Parser;
use configuration::{init_tracing, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};

mod app;
mod cli;
mod report;
mod shell;

use app::App;
use cli::{Cli, Commands, IndexCommand, ShowCommand};

/// The main entry point for the rebalancer.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Broker secrets and DATABASE_URL may live in a .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut settings = load_config_from(&cli.config)?;
    if let Some(kind) = cli.broker {
        settings.broker.kind = kind;
        settings.validate()?;
    }
    let _log_guard = init_tracing(&settings.logging)?;

    let app = App::bootstrap(&settings).await?;
    let result = dispatch(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn dispatch(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Index(IndexCommand::Add(args)) => {
            let added = app.add_symbol(&args.symbol, args.percentage, args.locked).await?;
            println!(
                "Added {} at {}%{}.",
                added.symbol,
                added.desired_percentage,
                if added.locked { " (locked)" } else { "" }
            );
            println!("{}", app.index_report().await?);
        }
        Commands::Index(IndexCommand::Generate) => handle_generate(app).await?,
        Commands::Run => handle_run(app).await?,
        Commands::Show(ShowCommand::Index) => println!("{}", app.index_report().await?),
        Commands::Show(ShowCommand::Stats) => println!("{}", app.stats_report().await?),
        Commands::Show(ShowCommand::Config) => println!("{}", app.config_report().await?),
        Commands::Shell => shell::run(app).await?,
    }
    Ok(())
}

/// Funds the index, reporting progress per symbol.
async fn handle_generate(app: &App) -> anyhow::Result<()> {
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let pb = progress_bar.clone();
    let summary = app
        .generate(move |symbol, total| {
            pb.set_length(total as u64);
            pb.inc(1);
            pb.set_message(format!("Funded {symbol}"));
        })
        .await;

    match summary {
        Ok(summary) => {
            progress_bar.finish_with_message("Index generated!");
            for funded in &summary.funded {
                println!(
                    "Bought {} {} at {} (order {}).",
                    funded.units, funded.symbol, funded.price, funded.order_id
                );
            }
            for skipped in &summary.skipped {
                eprintln!("Skipped {skipped}; see the log for details.");
            }
            Ok(())
        }
        Err(e) => {
            progress_bar.abandon_with_message("Generation failed.");
            Err(e)
        }
    }
}

/// Runs the rebalance loop until Ctrl-C.
async fn handle_run(app: &App) -> anyhow::Result<()> {
    app.control.start().await?;
    println!("Rebalance loop running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;

    // The stop is served once the in-flight cycle has finished.
    app.control.stop().await?;
    let status = app.control.status().await?;
    println!("Stopped after {} cycles.", status.cycles_completed);
    Ok(())
}
