//! # Database Crate
//!
//! The persistence boundary of the rebalancer. It owns the schema for the
//! index (`indexed_symbols`) and the singleton policy record
//! (`rebalance_configs`) and exposes both through the [`StateStore`] trait.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: establish the Postgres pool and bring the schema up to date.
//! - `StateStore`: the capability set the engine depends on.
//! - `DbRepository`: the Postgres implementation; multi-row writes run in one transaction.
//! - `MemoryStore`: a process-local implementation used for paper sessions and tests.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryStore;
pub use repository::DbRepository;
pub use store::{ConfigDefaults, StateStore};
