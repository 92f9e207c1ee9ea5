use thiserror::Error;

/// Failures surfaced by the budget and history pipelines.
///
/// Adapters speak `anyhow`; everything that reaches a caller of the core (or
/// the HTTP layer) is one of these.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Country not found: {0}")]
    CountryNotFound(String),

    #[error("Exchange rate unavailable for currency: {0}")]
    RateUnavailable(String),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),

    #[error("Request was cancelled")]
    Cancelled,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    /// Stable machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_failed",
            AppError::CountryNotFound(_) => "country_not_found",
            AppError::RateUnavailable(_) => "rate_unavailable",
            AppError::Upstream(_) => "upstream_error",
            AppError::Cancelled => "cancelled",
        }
    }
}
