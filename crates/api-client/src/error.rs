use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("The HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The broker returned {status}: {message}")]
    Broker { status: u16, message: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("No quote available for {0}")]
    QuoteUnavailable(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(String),
}
