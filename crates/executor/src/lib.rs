//! # Executor Crate
//!
//! Turns a trade decision into a filled order. The `Executor` trait is the
//! seam the allocation engine talks to; `LiveExecutor` implements it on top of
//! any `MarketAccess` adapter by placing a market order and waiting for it to
//! reach a terminal state.
//!
//! ## Fill semantics
//!
//! - The wait is bounded: every submission carries a deadline, and an order
//!   still open at the deadline is canceled (best effort) and reported as
//!   `ExecutorError::FillTimeout`.
//! - Transient status-poll failures are logged and retried until the deadline.
//! - `Rejected` maps to `ExecutorError::OrderRejected`; `Canceled`/`Expired`
//!   map to `ExecutorError::OrderCancelled`.
//!
//! ## Public API
//!
//! - `Executor`: the trait used by the engine.
//! - `LiveExecutor`: the polling implementation.
//! - `ExecutorError`: the errors returned from this crate.

pub mod error;
pub mod gateway;

pub use error::ExecutorError;
pub use gateway::{Executor, LiveExecutor};
