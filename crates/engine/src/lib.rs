//! # Engine Crate
//!
//! The capital allocation engine. It keeps an index of symbols with target
//! percentages, funds it once, and then periodically trades holdings back
//! towards their targets.
//!
//! - `IndexComposer`: adds symbols, making room through a `RedistributionStrategy`.
//! - `IndexGenerator`: the one-off purchase that funds the index.
//! - `DriftCalculator` / `TradeDecisioner`: the two halves of a cycle, composed
//!   by `Rebalancer`.
//! - `RebalanceLoop`: the background actor driving cycles, controlled through a
//!   `RebalanceHandle`.
//!
//! All of them share one `SharedStore`; every read-modify-write of the index or
//! configuration runs under its lock.

use api_client::MarketAccess;
use executor::Executor;
use std::sync::Arc;

pub mod composition;
pub mod control;
pub mod cycle;
pub mod decision;
pub mod drift;
pub mod error;
pub mod generator;
pub mod redistribution;
pub mod store;

pub use composition::{IndexComposer, plan_addition};
pub use control::{LoopState, LoopStatus, RebalanceHandle, RebalanceLoop};
pub use cycle::{CycleSummary, Rebalancer};
pub use decision::{SkipReason, TradeDecisioner, TradeReport};
pub use drift::{DriftCalculator, DriftReport};
pub use error::EngineError;
pub use generator::{FundedSymbol, GenerateSummary, IndexGenerator};
pub use redistribution::{EqualSplit, ProRata, RedistributionStrategy, strategy_for};
pub use store::{SharedStore, StoreGuard};

/// The collaborators every engine component is built from.
#[derive(Clone)]
pub struct EngineContext {
    pub store: SharedStore,
    pub market: Arc<dyn MarketAccess>,
    pub executor: Arc<dyn Executor>,
}

impl EngineContext {
    pub fn new(
        store: SharedStore,
        market: Arc<dyn MarketAccess>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            store,
            market,
            executor,
        }
    }
}
