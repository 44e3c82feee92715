use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // --- Validation ---
    #[error("Symbol '{0}' is already indexed")]
    AlreadyIndexed(String),

    #[error("Symbol '{0}' does not exist or is not tradeable on the broker")]
    SymbolNotTradeable(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid percentage: {0}")]
    InvalidPercentage(String),

    // --- Capacity ---
    #[error("Requested {requested}% exceeds the available unlocked allocation of {available}%")]
    InsufficientCapacity { requested: Decimal, available: Decimal },

    // --- Collaborators ---
    #[error("Market access error: {0}")]
    MarketAccess(#[from] api_client::ApiError),

    #[error("Execution error: {0}")]
    Execution(#[from] executor::ExecutorError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] database::DbError),

    // --- Control loop and index lifecycle ---
    #[error("The rebalance loop is already running")]
    AlreadyRunning,

    #[error("The rebalance loop is not running")]
    NotRunning,

    #[error("The index has not been generated yet; generate it before starting the rebalance loop")]
    IndexNotGenerated,

    #[error("The index has already been generated")]
    IndexAlreadyGenerated,

    #[error("Account value {available} is lower than the starting balance {required}")]
    InsufficientAccountValue { required: Decimal, available: Decimal },

    #[error("The rebalance loop task is no longer available")]
    LoopUnavailable,
}

impl From<core_types::CoreError> for EngineError {
    fn from(e: core_types::CoreError) -> Self {
        match e {
            core_types::CoreError::InvalidInput(field, reason) if field == "symbol" => {
                EngineError::InvalidSymbol(reason)
            }
            core_types::CoreError::InvalidInput(_, reason) => EngineError::InvalidPercentage(reason),
        }
    }
}
