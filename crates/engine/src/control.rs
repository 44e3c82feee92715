//! The rebalance control loop, run as an actor.
//!
//! The loop's run state lives inside the spawned task and only changes in
//! response to requests sent through a [`RebalanceHandle`]:
//!
//! - `Idle` waits for requests.
//! - `Running` runs a cycle immediately, then one every configured frequency,
//!   answering requests between cycles. A stop request is served once the
//!   in-flight cycle has finished.
//!
//! The task ends when every handle has been dropped.

use crate::EngineContext;
use crate::cycle::Rebalancer;
use crate::error::EngineError;
use crate::store::SharedStore;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

const REQUEST_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStatus {
    pub state: LoopState,
    /// Cycles finished since the task was spawned, successful or not.
    pub cycles_completed: u64,
}

enum ControlRequest {
    Start(oneshot::Sender<Result<(), EngineError>>),
    Stop(oneshot::Sender<Result<(), EngineError>>),
    Status(oneshot::Sender<LoopStatus>),
}

/// Cloneable handle used to drive the control loop.
#[derive(Clone)]
pub struct RebalanceHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl RebalanceHandle {
    /// Moves the loop from `Idle` to `Running`.
    ///
    /// Fails with `IndexNotGenerated` before the index is funded and with
    /// `AlreadyRunning` if the loop is running.
    pub async fn start(&self) -> Result<(), EngineError> {
        self.request(ControlRequest::Start).await?
    }

    /// Moves the loop back to `Idle`; fails with `NotRunning` if it is idle.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.request(ControlRequest::Stop).await?
    }

    pub async fn status(&self) -> Result<LoopStatus, EngineError> {
        self.request(ControlRequest::Status).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ControlRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| EngineError::LoopUnavailable)?;
        reply_rx.await.map_err(|_| EngineError::LoopUnavailable)
    }
}

pub struct RebalanceLoop {
    store: SharedStore,
    rebalancer: Rebalancer,
    rx: mpsc::Receiver<ControlRequest>,
    state: LoopState,
    cycles_completed: u64,
    frequency: Duration,
    next_cycle: Instant,
}

impl RebalanceLoop {
    /// Spawns the control loop on the current runtime, initially `Idle`.
    pub fn spawn(ctx: &EngineContext) -> (RebalanceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let actor = Self {
            store: ctx.store.clone(),
            rebalancer: Rebalancer::new(ctx),
            rx,
            state: LoopState::Idle,
            cycles_completed: 0,
            frequency: Duration::from_secs(1),
            next_cycle: Instant::now(),
        };
        let task = tokio::spawn(actor.run());
        (RebalanceHandle { tx }, task)
    }

    async fn run(mut self) {
        loop {
            match self.state {
                LoopState::Idle => match self.rx.recv().await {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
                LoopState::Running => {
                    tokio::select! {
                        biased;
                        request = self.rx.recv() => match request {
                            Some(request) => self.handle(request).await,
                            None => break,
                        },
                        _ = time::sleep_until(self.next_cycle) => self.cycle().await,
                    }
                }
            }
        }
        tracing::info!(cycles = self.cycles_completed, "Rebalance loop shut down.");
    }

    async fn handle(&mut self, request: ControlRequest) {
        match request {
            ControlRequest::Start(reply) => {
                let _ = reply.send(self.start().await);
            }
            ControlRequest::Stop(reply) => {
                let result = match self.state {
                    LoopState::Running => {
                        self.state = LoopState::Idle;
                        tracing::info!(cycles = self.cycles_completed, "Rebalance loop stopped.");
                        Ok(())
                    }
                    LoopState::Idle => Err(EngineError::NotRunning),
                };
                let _ = reply.send(result);
            }
            ControlRequest::Status(reply) => {
                let _ = reply.send(LoopStatus {
                    state: self.state,
                    cycles_completed: self.cycles_completed,
                });
            }
        }
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        if self.state == LoopState::Running {
            return Err(EngineError::AlreadyRunning);
        }
        let config = self.store.lock().await.get_configuration().await?;
        if !config.active {
            return Err(EngineError::IndexNotGenerated);
        }

        self.frequency = config.rebalance_frequency();
        self.next_cycle = Instant::now();
        self.state = LoopState::Running;
        tracing::info!(frequency = ?self.frequency, "Rebalance loop started.");
        Ok(())
    }

    async fn cycle(&mut self) {
        match self.rebalancer.run_cycle().await {
            Ok(summary) => {
                self.frequency = summary.next_cycle_in;
                tracing::info!(
                    cycle = self.cycles_completed + 1,
                    repriced = summary.drift.updated.len(),
                    sells = summary.trades.sells.len(),
                    buys = summary.trades.buys.len(),
                    "Rebalance cycle complete."
                );
            }
            Err(e) => {
                tracing::error!(cycle = self.cycles_completed + 1, error = %e, "Rebalance cycle failed.");
            }
        }
        self.cycles_completed += 1;
        self.next_cycle = Instant::now() + self.frequency;
    }
}
