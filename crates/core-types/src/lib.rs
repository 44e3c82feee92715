pub mod enums;
pub mod error;
pub mod math;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{OrderSide, OrderStatus};
pub use error::CoreError;
pub use math::CASH_SYMBOL;
pub use structs::{Fill, IndexedSymbol, NewIndexedSymbol, OrderRequest, RebalanceConfig};
