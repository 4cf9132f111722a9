//! History provider trait — the external download collaborator.
//!
//! Barvault owns no network code. Whatever feed is wired in (broker API,
//! vendor SDK) implements this trait; the core only orchestrates calls and
//! assumes no particular retry or backoff policy.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{BarRecord, Exchange, SeriesKey};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider error: {0}")]
    Other(String),
}

/// External source of historical market data.
pub trait HistoryProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for a series from `start` onward (inclusive).
    fn download_bar_data(
        &self,
        key: &SeriesKey,
        start: DateTime<Utc>,
    ) -> Result<Vec<BarRecord>, ProviderError>;

    /// Fetch tick data from `start` onward. Ticks are schema-less and
    /// provider-managed; only the count fetched is reported back.
    fn download_tick_data(
        &self,
        symbol: &str,
        exchange: Exchange,
        start: DateTime<Utc>,
    ) -> Result<usize, ProviderError>;
}
