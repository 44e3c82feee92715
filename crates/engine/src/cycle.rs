use crate::EngineContext;
use crate::decision::{TradeDecisioner, TradeReport};
use crate::drift::{DriftCalculator, DriftReport};
use crate::error::EngineError;
use crate::store::SharedStore;
use std::time::Duration;

/// Everything one rebalance cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub drift: DriftReport,
    pub trades: TradeReport,
    /// The configured pause before the next cycle, as read during this one.
    pub next_cycle_in: Duration,
}

/// One drift recomputation followed by the trade passes.
pub struct Rebalancer {
    store: SharedStore,
    drift: DriftCalculator,
    decisioner: TradeDecisioner,
}

impl Rebalancer {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            store: ctx.store.clone(),
            drift: DriftCalculator::new(ctx.market.clone()),
            decisioner: TradeDecisioner::new(ctx.executor.clone()),
        }
    }

    /// Runs a full cycle while holding the store lock.
    pub async fn run_cycle(&self) -> Result<CycleSummary, EngineError> {
        let store = self.store.lock().await;
        let mut config = store.get_configuration().await?;

        let drift = self.drift.recompute_all(&*store, &config).await?;
        let trades = self
            .decisioner
            .run_passes_except(&*store, &mut config, &drift.skipped)
            .await?;

        Ok(CycleSummary {
            drift,
            trades,
            next_cycle_in: config.rebalance_frequency(),
        })
    }
}
