//! Integration tests for drift, trade decisioning, index generation and full cycles.

mod common;

use api_client::FillBehaviour;
use common::harness;
use core_types::OrderSide;
use engine::{DriftCalculator, EngineError, IndexGenerator, Rebalancer, SkipReason, TradeDecisioner};
use rust_decimal_macros::dec;
use std::time::Duration;

// ============================================================================
// Drift
// ============================================================================

#[tokio::test]
async fn drift_reflects_relative_deviation_from_target() {
    let h = harness().await;
    h.hold("AAPL", dec!(50), dec!(0), dec!(100), 550).await;
    let config = h.config().await;

    let report = DriftCalculator::new(h.ctx.market.clone())
        .recompute_all(&*h.store, &config)
        .await
        .unwrap();

    assert_eq!(report.updated, vec!["AAPL".to_string()]);
    assert_eq!(h.symbol("AAPL").await.current_percentage, dec!(60));
}

#[tokio::test]
async fn drift_is_idempotent_for_unchanged_quotes() {
    let h = harness().await;
    h.hold("AAPL", dec!(30), dec!(0), dec!(187.25), 170).await;
    let config = h.config().await;
    let drift = DriftCalculator::new(h.ctx.market.clone());

    drift.recompute_all(&*h.store, &config).await.unwrap();
    let first = h.symbol("AAPL").await.current_percentage;
    drift.recompute_all(&*h.store, &config).await.unwrap();

    assert_eq!(h.symbol("AAPL").await.current_percentage, first);
}

#[tokio::test]
async fn drift_skips_symbols_without_a_quote() {
    let h = harness().await;
    h.hold("AAPL", dec!(20), dec!(20), dec!(100), 200).await;
    h.hold("MSFT", dec!(20), dec!(20), dec!(100), 200).await;
    h.paper.set_quote("MSFT", dec!(150));
    h.paper.fail_quotes_for("AAPL", true);
    let config = h.config().await;

    let report = DriftCalculator::new(h.ctx.market.clone())
        .recompute_all(&*h.store, &config)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec!["AAPL".to_string()]);
    assert_eq!(report.updated, vec!["MSFT".to_string()]);
    let aapl = h.symbol("AAPL").await;
    assert_eq!(aapl.current_price, dec!(100));
    assert_eq!(aapl.current_percentage, dec!(20));
    let msft = h.symbol("MSFT").await;
    assert_eq!(msft.current_price, dec!(150));
    // 30000 held against a 20000 target.
    assert_eq!(msft.current_percentage, dec!(70));
}

#[tokio::test]
async fn drift_never_touches_cash() {
    let h = harness().await;
    let before = h.symbol("USD").await;
    let config = h.config().await;

    DriftCalculator::new(h.ctx.market.clone())
        .recompute_all(&*h.store, &config)
        .await
        .unwrap();

    assert_eq!(h.symbol("USD").await, before);
}

// ============================================================================
// Trade decisioning
// ============================================================================

#[tokio::test]
async fn excess_above_threshold_is_sold() {
    let h = harness().await;
    h.update_config(|c| c.rebalance_threshold = dec!(5)).await;
    h.hold("AAPL", dec!(50), dec!(60), dec!(100), 550).await;
    let mut config = h.config().await;

    let report = TradeDecisioner::new(h.ctx.executor.clone())
        .run_passes(&*h.store, &mut config)
        .await
        .unwrap();

    // 55000 held, 10% of it is 5500, or 55 units at 100.
    assert_eq!(report.sells.len(), 1);
    assert_eq!(report.sells[0].quantity, 55);
    assert_eq!(report.sells[0].side, OrderSide::Sell);
    let aapl = h.symbol("AAPL").await;
    assert_eq!(aapl.amount, 495);
    assert_eq!(aapl.last_order_id.as_deref(), Some(report.sells[0].order_id.as_str()));
    assert_eq!(h.config().await.floating_percentage, dec!(10));
}

#[tokio::test]
async fn drift_within_threshold_is_left_alone() {
    let h = harness().await;
    h.update_config(|c| c.rebalance_threshold = dec!(5)).await;
    h.hold("AAPL", dec!(50), dec!(55), dec!(100), 550).await;
    h.hold("MSFT", dec!(20), dec!(15), dec!(100), 150).await;
    h.update_config(|c| c.floating_percentage = dec!(50)).await;
    let mut config = h.config().await;

    let report = TradeDecisioner::new(h.ctx.executor.clone())
        .run_passes(&*h.store, &mut config)
        .await
        .unwrap();

    assert!(report.sells.is_empty() && report.buys.is_empty());
    assert!(h.paper.orders().is_empty());
}

#[tokio::test]
async fn buy_without_enough_floating_is_skipped() {
    let h = harness().await;
    h.update_config(|c| c.rebalance_threshold = dec!(5)).await;
    h.hold("AAPL", dec!(50), dec!(40), dec!(100), 400).await;
    let mut config = h.config().await;

    let report = TradeDecisioner::new(h.ctx.executor.clone())
        .run_passes(&*h.store, &mut config)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec![("AAPL".to_string(), SkipReason::InsufficientFloating)]);
    assert_eq!(h.symbol("AAPL").await.amount, 400);
    assert_eq!(h.config().await.floating_percentage, dec!(0));
    assert!(h.paper.orders().is_empty());
}

#[tokio::test]
async fn floating_budget_funds_buys() {
    let h = harness().await;
    h.update_config(|c| {
        c.rebalance_threshold = dec!(5);
        c.floating_percentage = dec!(15);
    })
    .await;
    h.hold("AAPL", dec!(50), dec!(40), dec!(100), 400).await;
    let mut config = h.config().await;

    let report = TradeDecisioner::new(h.ctx.executor.clone())
        .run_passes(&*h.store, &mut config)
        .await
        .unwrap();

    assert_eq!(report.buys.len(), 1);
    assert_eq!(report.buys[0].quantity, 40);
    assert_eq!(h.symbol("AAPL").await.amount, 440);
    assert_eq!(h.config().await.floating_percentage, dec!(5));
}

#[tokio::test]
async fn sells_complete_before_buys_start() {
    let h = harness().await;
    // MSFT comes first in the index but has to wait for AAPL's sale to fund it.
    h.hold("MSFT", dec!(30), dec!(20), dec!(100), 200).await;
    h.hold("AAPL", dec!(50), dec!(60), dec!(100), 550).await;
    let mut config = h.config().await;

    let report = TradeDecisioner::new(h.ctx.executor.clone())
        .run_passes(&*h.store, &mut config)
        .await
        .unwrap();

    let orders = h.paper.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!((orders[0].symbol.as_str(), orders[0].side), ("AAPL", OrderSide::Sell));
    assert_eq!((orders[1].symbol.as_str(), orders[1].side), ("MSFT", OrderSide::Buy));
    assert_eq!(report.buys[0].quantity, 20);
    assert_eq!(h.config().await.floating_percentage, dec!(0));
}

#[tokio::test]
async fn rejected_order_does_not_block_other_symbols() {
    let h = harness().await;
    h.update_config(|c| c.floating_percentage = dec!(20)).await;
    h.hold("AAPL", dec!(50), dec!(60), dec!(100), 550).await;
    h.hold("MSFT", dec!(30), dec!(20), dec!(100), 200).await;
    h.paper.set_symbol_fill_behaviour("AAPL", FillBehaviour::Reject);
    let mut config = h.config().await;

    let report = TradeDecisioner::new(h.ctx.executor.clone())
        .run_passes(&*h.store, &mut config)
        .await
        .unwrap();

    assert!(report.sells.is_empty());
    assert!(matches!(report.skipped[0], (ref s, SkipReason::OrderFailed(_)) if s == "AAPL"));
    assert_eq!(h.symbol("AAPL").await.amount, 550);
    assert_eq!(report.buys.len(), 1);
    assert_eq!(h.symbol("MSFT").await.amount, 220);
    assert_eq!(h.config().await.floating_percentage, dec!(10));
}

#[tokio::test]
async fn drift_smaller_than_one_unit_is_skipped() {
    let h = harness().await;
    h.hold("BRK.A", dec!(50), dec!(52), dec!(600000), 1).await;
    let mut config = h.config().await;

    let report = TradeDecisioner::new(h.ctx.executor.clone())
        .run_passes(&*h.store, &mut config)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec![("BRK.A".to_string(), SkipReason::BelowOneUnit)]);
    assert!(h.paper.orders().is_empty());
}

// ============================================================================
// Index generation
// ============================================================================

#[tokio::test]
async fn generate_funds_every_symbol_and_activates() {
    let h = harness().await;
    h.paper.set_quote("AAPL", dec!(150));
    h.paper.set_quote("MSFT", dec!(300));
    let composer = h.composer();
    composer.add_symbol("AAPL", dec!(30), false).await.unwrap();
    composer.add_symbol("MSFT", dec!(20), false).await.unwrap();

    let mut progress = Vec::new();
    let summary = IndexGenerator::new(&h.ctx)
        .generate_with_progress(|symbol, total| progress.push((symbol.to_string(), total)))
        .await
        .unwrap();

    assert_eq!(summary.funded.len(), 2);
    assert!(summary.skipped.is_empty());
    assert_eq!(progress.len(), 2);
    assert!(progress.iter().all(|(_, total)| *total == 2));

    // The second addition split 20 evenly between USD and AAPL.
    let aapl = h.symbol("AAPL").await;
    assert_eq!(aapl.desired_percentage, dec!(20));
    assert_eq!(aapl.amount, 133);
    assert_eq!(aapl.current_percentage, dec!(20));
    assert_eq!(h.symbol("MSFT").await.amount, 66);
    assert!(h.config().await.active);
}

#[tokio::test]
async fn generate_runs_only_once() {
    let h = harness().await;
    let generator = IndexGenerator::new(&h.ctx);
    generator.generate().await.unwrap();
    assert!(matches!(
        generator.generate().await,
        Err(EngineError::IndexAlreadyGenerated)
    ));
}

#[tokio::test]
async fn generate_requires_the_starting_balance() {
    let h = harness().await;
    h.paper.set_account_value(dec!(99999.99));

    let result = IndexGenerator::new(&h.ctx).generate().await;

    assert!(matches!(result, Err(EngineError::InsufficientAccountValue { .. })));
    assert!(!h.config().await.active);
}

#[tokio::test]
async fn generate_skips_symbols_that_fail() {
    let h = harness().await;
    h.paper.set_quote("AAPL", dec!(150));
    h.paper.set_quote("MSFT", dec!(300));
    let composer = h.composer();
    composer.add_symbol("AAPL", dec!(30), false).await.unwrap();
    composer.add_symbol("MSFT", dec!(20), false).await.unwrap();
    h.paper.set_symbol_fill_behaviour("AAPL", FillBehaviour::Reject);

    let summary = IndexGenerator::new(&h.ctx).generate().await.unwrap();

    assert_eq!(summary.skipped, vec!["AAPL".to_string()]);
    assert_eq!(summary.funded[0].symbol, "MSFT");
    assert_eq!(h.symbol("AAPL").await.amount, 0);
    assert!(h.config().await.active);
}

// ============================================================================
// Full cycle
// ============================================================================

#[tokio::test]
async fn cycle_sells_a_symbol_whose_price_rose() {
    let h = harness().await;
    h.paper.set_quote("AAPL", dec!(150));
    h.composer().add_symbol("AAPL", dec!(30), false).await.unwrap();
    IndexGenerator::new(&h.ctx).generate().await.unwrap();
    assert_eq!(h.symbol("AAPL").await.amount, 200);

    h.paper.set_quote("AAPL", dec!(180));
    let summary = Rebalancer::new(&h.ctx).run_cycle().await.unwrap();

    // 200 units at 180 is 36000 against a 30000 target: 20% over.
    let aapl = h.symbol("AAPL").await;
    assert_eq!(aapl.current_percentage, dec!(50));
    assert_eq!(summary.trades.sells[0].quantity, 40);
    assert_eq!(aapl.amount, 160);
    assert_eq!(h.config().await.floating_percentage, dec!(20));
    assert_eq!(summary.next_cycle_in, Duration::from_secs(60));
}

#[tokio::test]
async fn cycle_fails_without_configuration() {
    let h = common::bare_harness();
    assert!(matches!(
        Rebalancer::new(&h.ctx).run_cycle().await,
        Err(EngineError::Persistence(_))
    ));
}

#[tokio::test]
async fn cycles_without_a_quote_do_not_trade_the_symbol() {
    let h = harness().await;
    h.update_config(|c| c.rebalance_threshold = dec!(5)).await;
    h.hold("AAPL", dec!(50), dec!(50), dec!(100), 550).await;
    let rebalancer = Rebalancer::new(&h.ctx);

    let first = rebalancer.run_cycle().await.unwrap();
    assert_eq!(first.trades.sells[0].quantity, 55);
    assert_eq!(h.config().await.floating_percentage, dec!(10));

    h.paper.fail_quotes_for("AAPL", true);
    for _ in 0..2 {
        let summary = rebalancer.run_cycle().await.unwrap();
        assert_eq!(summary.drift.skipped, vec!["AAPL".to_string()]);
        assert!(summary.trades.sells.is_empty() && summary.trades.buys.is_empty());
        assert_eq!(
            summary.trades.skipped,
            vec![("AAPL".to_string(), SkipReason::StaleQuote)]
        );
    }

    assert_eq!(h.paper.orders().len(), 1);
    assert_eq!(h.symbol("AAPL").await.amount, 495);
    assert_eq!(h.config().await.floating_percentage, dec!(10));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(start_paused = true)]
async fn symbol_addition_waits_for_an_in_flight_cycle() {
    let h = harness().await;
    h.hold("AAPL", dec!(50), dec!(50), dec!(100), 550).await;
    h.settle_cash().await;
    h.paper.set_quote("MSFT", dec!(300));
    h.paper.set_symbol_fill_behaviour("AAPL", FillBehaviour::AfterPolls(5));

    let rebalancer = Rebalancer::new(&h.ctx);
    let cycle = tokio::spawn(async move { rebalancer.run_cycle().await });

    // Wait until the cycle holds the store and its sell is pending at the broker.
    while h.paper.orders().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(!cycle.is_finished());

    let msft = h.composer().add_symbol("MSFT", dec!(10), false).await.unwrap();

    // The add could only take the lock once the cycle had written its fill.
    assert!(cycle.is_finished());
    let summary = cycle.await.unwrap().unwrap();
    assert_eq!(summary.trades.sells[0].quantity, 55);

    let aapl = h.symbol("AAPL").await;
    assert_eq!(aapl.amount, 495);
    assert_eq!(aapl.desired_percentage, dec!(45));
    assert_eq!(h.symbol("USD").await.desired_percentage, dec!(45));
    assert_eq!(msft.desired_percentage, dec!(10));
    assert_eq!(h.desired_total().await, dec!(100));
}
