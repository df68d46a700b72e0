use serde::Serialize;

/// Error taxonomy for the stock core.
///
/// Entity validation and orchestrator errors propagate to the caller
/// unmodified so it can distinguish a missing record from an invalid or
/// insufficient adjustment. Data-source failures inside the stats cache are
/// absorbed there (stale-or-empty fallback) and never reach the caller.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Data source error: {0}")]
    DataSourceError(String),

    #[error("Event error: {0}")]
    EventError(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn data_source(message: impl Into<String>) -> Self {
        ServiceError::DataSourceError(message.into())
    }

    /// True for errors the caller may retry with different arguments
    /// (smaller quantity, different product) rather than abort outright.
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            ServiceError::ValidationError(_)
                | ServiceError::InvalidAdjustment(_)
                | ServiceError::InsufficientStock(_)
        )
    }
}
