//! Error types for the dashboard

use thiserror::Error;

use crate::asset::Provider;

/// Dashboard-wide error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    /// A market-data fetch failed or returned an unexpected/empty shape
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: Provider, message: String },

    /// Watchlist or preferences persistence failed
    #[error("Store error: {0}")]
    Store(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashboardError {
    pub fn provider(provider: Provider, message: impl Into<String>) -> Self {
        DashboardError::Provider {
            provider,
            message: message.into(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        DashboardError::Store(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        DashboardError::Auth(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DashboardError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DashboardError::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        DashboardError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DashboardError::Internal(msg.into())
    }

    /// True for market-data failures
    pub fn is_provider_error(&self) -> bool {
        matches!(self, DashboardError::Provider { .. })
    }

    /// True for failures of the hosted auth/persistence backend
    pub fn is_store_error(&self) -> bool {
        matches!(self, DashboardError::Store(_) | DashboardError::Auth(_))
    }
}

/// Result type alias for dashboard operations
pub type DashboardResult<T> = Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(DashboardError::provider(Provider::Polygon, "no rows").is_provider_error());
        assert!(DashboardError::store("offline").is_store_error());
        assert!(DashboardError::auth("expired").is_store_error());
        assert!(!DashboardError::validation("mismatch").is_store_error());
    }

    #[test]
    fn test_provider_error_display() {
        let err = DashboardError::provider(Provider::CoinGecko, "HTTP 429");
        assert_eq!(err.to_string(), "Provider error (CoinGecko): HTTP 429");
    }
}
