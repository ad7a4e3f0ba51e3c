/// Domain-specific error types for the pricing engines.
/// All failures are construction-time or calibration-time; nothing is retried.
/// Non-finite numerical results (zero volatility, arbitrage-inconsistent
/// factors) are returned as values, not raised here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid option type: {0:?} (expected 'call' or 'put')")]
    InvalidOptionType(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("report error: {0}")]
    Report(String),
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::Report(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PricingError {
    fn from(e: tokio::task::JoinError) -> Self {
        PricingError::Worker(e.to_string())
    }
}

pub type PricingResult<T> = Result<T, PricingError>;
