//! Market bars provider abstraction.
//!
//! Defines the `BarsProvider` trait the market pipeline fetches through,
//! so the chart API can be swapped or mocked.

use async_trait::async_trait;
use thiserror::Error;

use super::OhlcBar;

/// Errors specific to bar providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Data not available for the requested symbol
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Check if the error is transient (worth re-triggering later)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Trait for daily OHLC bar sources.
#[async_trait]
pub trait BarsProvider: Send + Sync {
    /// Provider name for logging (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch the full available daily history for a symbol.
    ///
    /// Bars may arrive in any order; callers sort by date.
    async fn get_daily_bars(&self, symbol: &str) -> Result<Vec<OhlcBar>, ProviderError>;
}
