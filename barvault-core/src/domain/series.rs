//! SeriesKey and SeriesOverview — identity and summary of one stored series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Exchange, Interval};

/// (symbol, exchange, interval) — uniquely identifies one stored series.
///
/// The aggregation and deletion unit: the catalog groups by it, upserts are
/// atomic per key, deletes remove everything under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub exchange: Exchange,
    pub interval: Interval,
}

impl SeriesKey {
    pub fn new(symbol: impl Into<String>, exchange: Exchange, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
            interval,
        }
    }

    /// Venue-qualified symbol, e.g. `rb2410.SHFE`.
    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {}", self.symbol, self.exchange, self.interval)
    }
}

/// Count and time bounds of one stored series, without the bar data itself.
///
/// Produced by the store, consumed read-only by the catalog. Reconstructed
/// on demand; holds no identity across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOverview {
    pub key: SeriesKey,
    pub count: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
