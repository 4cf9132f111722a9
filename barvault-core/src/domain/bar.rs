//! BarRecord — one fixed-interval price bar, normalized to UTC.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Exchange, Interval, SeriesKey};

/// A single OHLCV(+turnover/open-interest) bar.
///
/// Timestamps are always in the canonical internal timezone (UTC); source
/// timezones are resolved by the parser before a record is constructed.
/// Prices may be negative (short-selling-adjusted feeds), volume, turnover
/// and open interest may not. Records are transient: built by the parser,
/// handed to the store, never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub symbol: String,
    pub exchange: Exchange,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub turnover: Decimal,
    pub open_interest: Decimal,
}

impl BarRecord {
    /// The series this bar belongs to.
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.symbol.clone(), self.exchange, self.interval)
    }
}
